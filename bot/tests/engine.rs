use libtetris::*;
use spinbot::evaluation::Standard;
use spinbot::tree::{Tree, ROOT};
use spinbot::{CommitMode, Engine, Options};

fn seven_bag() -> Vec<Piece> {
    vec![Piece::I, Piece::O, Piece::T, Piece::S, Piece::Z, Piece::J, Piece::L]
}

fn engine(max_iterations: u32) -> Engine<Standard> {
    Engine::new(
        Standard::default(),
        Options {
            max_iterations,
            ..Options::default()
        },
    )
}

fn check_values(tree: &Tree, id: usize) {
    let node = tree.node(id);
    for &child in &node.children {
        assert_eq!(tree.node(child).parent, Some(id));
        assert!(!tree.node(child).dead);
        check_values(tree, child);
    }
    if let Some(&best) = node.children.first() {
        assert_eq!(node.value, tree.node(best).value);
        for pair in node.children.windows(2) {
            assert!(tree.node(pair[0]).value >= tree.node(pair[1]).value);
        }
    }
}

#[test]
fn empty_board_suggestions_are_legal() {
    let mut engine = engine(300);
    let start = GameState::new(Board::new(), seven_bag(), None);
    engine.load(start.clone());
    engine.think(|| {}).unwrap();

    let moves = engine.best_moves().unwrap();
    assert!(!moves.is_empty());
    assert!(!moves[0].dead);
    for candidate in &moves {
        let location = &candidate.mv.location;
        assert!(!start.board.obstructed(location));
        for &(x, y) in &location.cells() {
            assert!((0..WIDTH as i32).contains(&x));
            assert!((0..HEIGHT as i32).contains(&y));
        }
        assert_eq!(start.piece_for(candidate.mv.source), Some(location.kind.0));
    }
    for pair in moves.windows(2) {
        if !pair[1].dead {
            assert!(pair[0].value >= pair[1].value);
        }
    }
}

#[test]
fn backed_up_values_are_the_best_child() {
    let mut engine = engine(400);
    engine.load(GameState::new(Board::new(), seven_bag(), None));
    engine.think(|| {}).unwrap();
    let tree = engine.tree().unwrap();
    assert!(tree.len() > 1);
    check_values(tree, ROOT);
}

#[test]
fn committing_keeps_the_searched_subtree() {
    let mut engine = engine(300);
    engine.load(GameState::new(Board::new(), seven_bag(), None));
    engine.think(|| {}).unwrap();

    let best = engine.best_moves().unwrap().remove(0);
    let plan = engine.plan().unwrap();
    assert_eq!(plan[0].mv, best.mv);

    assert_eq!(engine.commit_index(0), Ok(CommitMode::Reused));
    assert_eq!(engine.state(), Some(&best.state));
    assert_eq!(engine.iterations(), 0);
    check_values(engine.tree().unwrap(), ROOT);
    assert!(engine.tree().unwrap().root().parent.is_none());

    // The budget starts over after a commit.
    let outcome = engine.think(|| {}).unwrap();
    assert_eq!(outcome.iterations, 300);
}

#[test]
fn cancel_from_another_thread() {
    let mut engine = engine(1_000_000);
    engine.load(GameState::new(Board::new(), seven_bag(), None));
    let token = engine.cancel_token();
    let canceller = std::thread::spawn(move || {
        std::thread::sleep(std::time::Duration::from_millis(50));
        token.cancel();
    });
    let outcome = engine.think(std::thread::yield_now).unwrap();
    canceller.join().unwrap();
    assert!(outcome.cancelled);
    assert!(outcome.iterations < 1_000_000);
    assert_eq!(outcome.iterations % engine.options().yield_every, 0);
    assert!(!engine.best_moves().unwrap().is_empty());
}

#[test]
fn revealed_pieces_extend_the_search() {
    let mut engine = engine(200);
    engine.load(GameState::new(Board::new(), vec![Piece::T], None));
    engine.think(|| {}).unwrap();
    // With one piece and no hold target, no child can go further.
    let depth = engine.plan().unwrap().len();
    assert_eq!(depth, 1);

    engine.add_next_piece(Piece::I).unwrap();
    engine.add_next_piece(Piece::O).unwrap();
    engine.commit_index(0).unwrap();
    engine.think(|| {}).unwrap();
    let tree = engine.tree().unwrap();
    assert!(tree
        .root()
        .children
        .iter()
        .any(|&c| !tree.node(c).children.is_empty()));
    assert_eq!(engine.state().unwrap().queue.len(), 2);
}

#[test]
fn pending_garbage_rises_after_a_quiet_placement() {
    let mut state = GameState::new(Board::new(), seven_bag(), None);
    state.add_incoming(4);
    let piece = FallingPiece::spawn(Piece::I, &state.board).unwrap();
    let mut dropped = piece;
    dropped.sonic_drop(&state.board);
    let (next, lock) = state.apply(&dropped, PieceSource::Current);
    assert_eq!(lock.garbage_received, 4);
    assert_eq!(next.incoming_total(), 0);
    let garbage_rows = next
        .board
        .rows()
        .iter()
        .filter(|row| row.cells().contains(&CellColor::Garbage))
        .count();
    assert_eq!(garbage_rows, 4);
}
