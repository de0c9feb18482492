use tbi::message::{Cell, Piece};
use tbi::{Config, Control, Message, Session};

fn session() -> Session {
    let mut config = Config::default();
    config.engine.max_iterations = 100;
    Session::new(&config, None).unwrap()
}

fn empty_board() -> Vec<Vec<Cell>> {
    vec![vec![None; 10]; 20]
}

fn start(queue: &[&str]) -> Message {
    Message::Start {
        board: empty_board(),
        queue: queue.iter().map(|s| s.to_string()).collect(),
        hold: None,
        combo: 0,
        back_to_back: false,
        weights_name: None,
    }
}

fn send(session: &mut Session, msg: Message) -> Vec<Message> {
    let mut out = vec![];
    assert_eq!(session.handle(msg, &mut out), Control::Continue);
    out
}

fn error_code(replies: &[Message]) -> &str {
    match replies {
        [Message::Error { code, .. }] => code,
        other => panic!("expected a single error, got {:?}", other),
    }
}

#[test]
fn rules_get_a_ready() {
    let mut session = session();
    match &send(&mut session, Message::Rules)[..] {
        [Message::Ready { name, .. }] => assert_eq!(name, "spinbot"),
        other => panic!("unexpected replies {:?}", other),
    }
}

#[test]
fn suggest_before_start_is_an_error() {
    let mut session = session();
    assert_eq!(error_code(&send(&mut session, Message::Suggest)), "not-loaded");
}

#[test]
fn rejected_start_loads_nothing() {
    let mut session = session();
    let replies = send(&mut session, start(&["I", "O"]));
    assert_eq!(error_code(&replies), "queue-too-short");
    assert!(!session.is_thinking());
    assert!(session.engine().state().is_none());

    let replies = send(&mut session, start(&["I", "O", "X"]));
    assert_eq!(error_code(&replies), "invalid-queue-piece");

    let mut bad = start(&["I", "O", "T"]);
    if let Message::Start { weights_name, .. } = &mut bad {
        *weights_name = Some("nonsense".to_owned());
    }
    assert_eq!(error_code(&send(&mut session, bad)), "unknown-profile");
    assert!(session.engine().state().is_none());
}

#[test]
fn start_think_suggest_play() {
    let mut session = session();
    assert!(send(&mut session, start(&["I", "O", "T", "S", "Z", "J", "L"])).is_empty());
    assert!(session.is_thinking());

    session.think();
    assert!(!session.is_thinking());

    let replies = send(&mut session, Message::Suggest);
    let (moves, rollouts) = match &replies[..] {
        [Message::Suggestion { moves, move_info }] => (moves.clone(), move_info.rollouts),
        other => panic!("unexpected replies {:?}", other),
    };
    assert_eq!(rollouts, 100);
    assert!(!moves.is_empty());
    for suggestion in &moves {
        let location = &suggestion.mv.location;
        assert_eq!(location.block_positions.len(), 4);
        for &[x, y] in &location.block_positions {
            assert!((0..10).contains(&x) && (0..20).contains(&y));
        }
        assert_eq!(suggestion.board.len(), 20);
    }

    let best = moves[0].mv.clone();
    assert!(send(&mut session, Message::Play { mv: best }).is_empty());
    assert!(session.is_thinking());
    assert_eq!(session.engine().iterations(), 0);
    let state = session.engine().state().unwrap();
    assert_eq!(state.queue.len() + state.hold.iter().count(), 6);

    assert!(send(&mut session, Message::NewPiece { piece: Piece::T }).is_empty());
    let state = session.engine().state().unwrap();
    assert_eq!(state.queue.back(), Some(&libtetris::Piece::T));
}

#[test]
fn playing_a_piece_that_is_not_there_fails() {
    let mut session = session();
    send(&mut session, start(&["I", "O", "T"]));
    let mut replies = send(&mut session, Message::Suggest);
    let mut mv = match replies.pop() {
        Some(Message::Suggestion { moves, .. }) => moves[0].mv.clone(),
        other => panic!("unexpected reply {:?}", other),
    };
    mv.location.kind = Piece::Z;
    assert_eq!(
        error_code(&send(&mut session, Message::Play { mv })),
        "piece-unavailable"
    );
    assert_eq!(session.engine().state().unwrap().queue.len(), 3);
}

#[test]
fn quit_ends_the_session() {
    let mut session = session();
    let mut out = vec![];
    assert_eq!(session.handle(Message::Quit, &mut out), Control::Quit);
    assert!(out.is_empty());
}

#[test]
fn wire_format() {
    let msg: Message = serde_json::from_str(r#"{"type":"new_piece","piece":"T"}"#).unwrap();
    assert_eq!(msg, Message::NewPiece { piece: Piece::T });

    let msg: Message = serde_json::from_str(r#"{"type":"start","board":[],"queue":[]}"#).unwrap();
    assert_eq!(
        msg,
        Message::Start {
            board: vec![],
            queue: vec![],
            hold: None,
            combo: 0,
            back_to_back: false,
            weights_name: None,
        }
    );

    let msg: Message = serde_json::from_str(r#"{"type":"something_else"}"#).unwrap();
    assert_eq!(msg, Message::Unknown);

    let json = serde_json::to_value(&Message::error("not-loaded", "nothing loaded")).unwrap();
    assert_eq!(json["type"], "error");
    assert_eq!(json["code"], "not-loaded");
}

#[test]
fn unknown_messages_are_ignored() {
    let mut session = session();
    assert!(send(&mut session, Message::Unknown).is_empty());
}
