use spinbot::evaluation::{Evaluator, Standard, WeightProfile};
use spinbot::{CancelToken, CommitMode, Engine, EngineError, Placement};

use crate::config::Config;
use crate::convert::{self, ValidationError};
use crate::message::{Message, MoveInfo};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Control {
    Continue,
    Quit,
}

/// Protocol state for one connection: the engine plus whether it should be thinking between
/// messages.
pub struct Session {
    engine: Engine<Standard>,
    custom: Option<WeightProfile>,
    profile: String,
    thinking: bool,
    verbose: bool,
}

impl Session {
    /// `custom` is an extra weight profile that `start` messages can select by its name.
    pub fn new(config: &Config, custom: Option<WeightProfile>) -> Result<Session, ValidationError> {
        let profile = config.engine.profile.clone();
        let mut session = Session {
            engine: Engine::new(Standard::default(), config.engine.clone()),
            custom,
            profile: profile.clone(),
            thinking: false,
            verbose: config.verbose,
        };
        let weights = session.weights(&profile)?;
        session.engine.set_evaluator(weights);
        Ok(session)
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.engine.cancel_token()
    }

    pub fn is_thinking(&self) -> bool {
        self.thinking
    }

    pub fn engine(&self) -> &Engine<Standard> {
        &self.engine
    }

    pub fn log(&self, msg: &str) {
        if self.verbose {
            eprintln!("[tbi] {}", msg);
        }
    }

    fn weights(&self, name: &str) -> Result<Standard, ValidationError> {
        match &self.custom {
            Some(custom) if custom.name == name => custom
                .to_weights()
                .map_err(|_| ValidationError::UnknownProfile(name.to_owned())),
            _ => convert::profile(name),
        }
    }

    /// Handles one message, pushing any replies onto `out`.
    pub fn handle(&mut self, msg: Message, out: &mut Vec<Message>) -> Control {
        match msg {
            Message::Rules => out.push(Message::Ready {
                name: "spinbot".to_owned(),
                version: env!("CARGO_PKG_VERSION").to_owned(),
                author: "MinusKelvin".to_owned(),
            }),
            Message::Start {
                board,
                queue,
                hold,
                combo,
                back_to_back,
                weights_name,
            } => {
                self.thinking = false;
                let name = weights_name.unwrap_or_else(|| self.profile.clone());
                let loaded = self.weights(&name).and_then(|weights| {
                    convert::parse_state(&board, &queue, hold.as_deref(), combo, back_to_back)
                        .map(|state| (weights, state))
                });
                match loaded {
                    Ok((weights, state)) => {
                        if *self.engine.evaluator() != weights {
                            self.log(&format!("switching weights to {}", weights.name()));
                        }
                        self.engine.set_evaluator(weights);
                        self.log(&format!(
                            "loaded state: hold={:?} queue={} combo={} b2b={}",
                            state.hold,
                            state.queue.len(),
                            state.combo,
                            state.b2b
                        ));
                        self.engine.load(state);
                        self.thinking = true;
                    }
                    Err(e) => {
                        self.log(&format!("rejected start: {}", e));
                        out.push(Message::error(e.code(), &e));
                    }
                }
            }
            Message::Suggest => {
                self.thinking = false;
                match self.engine.best_moves() {
                    Ok(moves) => {
                        self.log(&format!(
                            "suggesting {} moves after {} iterations",
                            moves.len(),
                            self.engine.iterations()
                        ));
                        out.push(Message::Suggestion {
                            moves: moves.iter().map(convert::suggestion).collect(),
                            move_info: MoveInfo {
                                rollouts: self.engine.iterations(),
                            },
                        });
                    }
                    Err(e) => out.push(engine_error(&e)),
                }
            }
            Message::Play { mv } => {
                self.thinking = false;
                let location = convert::from_move(&mv);
                let source = match self.engine.state() {
                    Some(state) => state.source_of(location.kind.0),
                    None => {
                        out.push(engine_error(&EngineError::NotLoaded));
                        return Control::Continue;
                    }
                };
                let source = match source {
                    Some(source) => source,
                    None => {
                        out.push(engine_error(&EngineError::PieceUnavailable));
                        return Control::Continue;
                    }
                };
                match self.engine.commit(&Placement { location, source }) {
                    Ok(CommitMode::Reused) => {
                        self.log("played a searched move, keeping its subtree");
                        self.thinking = true;
                    }
                    Ok(CommitMode::Rebuilt) => {
                        self.log("played an unsearched move, starting over");
                        self.thinking = true;
                    }
                    Err(e) => {
                        self.log(&format!("rejected play: {}", e));
                        out.push(engine_error(&e));
                    }
                }
            }
            Message::NewPiece { piece } => {
                if let Err(e) = self.engine.add_next_piece(piece.into()) {
                    out.push(engine_error(&e));
                }
            }
            Message::Stop => self.thinking = false,
            Message::Quit => {
                self.thinking = false;
                return Control::Quit;
            }
            other => self.log(&format!("ignoring message {:?}", other)),
        }
        Control::Continue
    }

    /// Runs the engine until it finishes or is cancelled.
    pub fn think(&mut self) {
        match self.engine.think(std::thread::yield_now) {
            Ok(outcome) if outcome.cancelled => {}
            Ok(outcome) => {
                self.log(&format!(
                    "think finished: {} iterations this run, {} total",
                    outcome.iterations,
                    self.engine.iterations()
                ));
                self.thinking = false;
            }
            Err(e) => {
                self.log(&format!("can't think: {}", e));
                self.thinking = false;
            }
        }
    }
}

pub fn engine_error(e: &EngineError) -> Message {
    let code = match e {
        EngineError::NotLoaded => "not-loaded",
        EngineError::MoveOutOfRange { .. } => "move-out-of-range",
        EngineError::IllegalMove => "illegal-move",
        EngineError::PieceUnavailable => "piece-unavailable",
    };
    Message::error(code, e)
}
