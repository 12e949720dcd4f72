use super::*;
use proptest::prelude::*;

fn card(value: u8, suit: Suit) -> Card {
    Card::new(value, suit).expect("valid card")
}

#[test]
fn test_card_rejects_out_of_range_values() {
    assert_eq!(Card::new(1, Suit::Hearts), Err(CardError::InvalidValue(1)));
    assert_eq!(Card::new(15, Suit::Spades), Err(CardError::InvalidValue(15)));
    assert!(Card::new(2, Suit::Clubs).is_ok());
    assert!(Card::new(14, Suit::Diamonds).is_ok());
}

#[test]
fn test_card_display_labels() {
    assert_eq!(card(2, Suit::Clubs).display(), "2♣");
    assert_eq!(card(10, Suit::Hearts).display(), "10♥");
    assert_eq!(card(11, Suit::Spades).display(), "J♠");
    assert_eq!(card(14, Suit::Diamonds).to_string(), "A♦");
}

#[test]
fn test_card_json_shape() {
    let json = serde_json::to_value(card(12, Suit::Hearts)).unwrap();
    assert_eq!(
        json,
        serde_json::json!({ "value": 12, "suit": "Hearts", "display": "Q♥" })
    );
}

#[test]
fn test_card_json_rejects_outside_closed_set() {
    let bad_value = r#"{"value":15,"suit":"Hearts"}"#;
    assert!(serde_json::from_str::<Card>(bad_value).is_err());
    let bad_suit = r#"{"value":5,"suit":"Stars"}"#;
    assert!(serde_json::from_str::<Card>(bad_suit).is_err());
    let bad_display = r#"{"value":5,"suit":"Hearts","display":"6♥"}"#;
    assert!(serde_json::from_str::<Card>(bad_display).is_err());
}

#[test]
fn test_suit_and_color_parse_case_insensitive() {
    assert_eq!("spades".parse::<Suit>().unwrap(), Suit::Spades);
    assert_eq!("Hearts".parse::<Suit>().unwrap(), Suit::Hearts);
    assert!("joker".parse::<Suit>().is_err());
    assert_eq!("black".parse::<Color>().unwrap(), Color::Black);
    assert_eq!("RED".parse::<Color>().unwrap(), Color::Red);
    assert!("green".parse::<Color>().is_err());
}

#[test]
fn test_suit_colors() {
    assert_eq!(Suit::Clubs.color(), Color::Black);
    assert_eq!(Suit::Spades.color(), Color::Black);
    assert_eq!(Suit::Hearts.color(), Color::Red);
    assert_eq!(Suit::Diamonds.color(), Color::Red);
}

#[test]
fn test_standard_deck_is_complete() {
    let deck = Deck::standard();
    assert_eq!(deck.len(), DECK_SIZE);
    let unique: std::collections::HashSet<_> = deck.cards().iter().copied().collect();
    assert_eq!(unique.len(), DECK_SIZE);
}

#[test]
fn test_deck_rejects_duplicates() {
    let cards = vec![card(2, Suit::Clubs), card(2, Suit::Clubs)];
    assert!(matches!(
        Deck::from_cards(cards),
        Err(CardError::DuplicateCard(_))
    ));
}

#[test]
fn test_deck_pops_from_top() {
    let mut deck = Deck::from_cards(vec![card(9, Suit::Hearts), card(2, Suit::Clubs)]).unwrap();
    assert_eq!(deck.pop(), Some(card(2, Suit::Clubs)));
    assert_eq!(deck.pop(), Some(card(9, Suit::Hearts)));
    assert_eq!(deck.pop(), None);
}

#[test]
fn test_attempt_state_follows_filled_steps() {
    let mut attempt = Attempt::new("wallet", GamePhase::Initial);
    assert_eq!(attempt.state(), AttemptState::Unstarted);
    attempt.steps[0] = Some(card(2, Suit::Clubs));
    assert_eq!(attempt.state(), AttemptState::Step1Done);
    attempt.steps[1] = Some(card(5, Suit::Hearts));
    attempt.steps[2] = Some(card(7, Suit::Hearts));
    attempt.steps[3] = Some(card(9, Suit::Spades));
    assert_eq!(attempt.state(), AttemptState::Step4Done);
    assert!(attempt.is_complete());
    assert_eq!(attempt.drawn().len(), 4);
}

#[test]
fn test_attempt_state_wire_names() {
    assert_eq!(
        serde_json::to_value(AttemptState::Step1Done).unwrap(),
        serde_json::json!("Step1Done")
    );
    assert_eq!(
        serde_json::to_value(AttemptState::Unstarted).unwrap(),
        serde_json::json!("Unstarted")
    );
}

#[test]
fn test_step_ordering_helpers() {
    assert_eq!(Step::RedBlack.previous(), None);
    assert_eq!(Step::Suit.previous(), Some(Step::InsideOutside));
    assert_eq!(Step::try_from(3).unwrap(), Step::InsideOutside);
    assert!(Step::try_from(5).is_err());
    assert_eq!(GamePhase::try_from(2).unwrap(), GamePhase::Guessing);
    assert!(GamePhase::try_from(4).is_err());
}

#[test]
fn test_wallet_record_validate_detects_gaps() {
    let mut record = WalletRecord::new("wallet", 7, REGISTRATION_COST);
    record.validate_invariants().expect("fresh record is valid");

    let mut attempt = Attempt::new("wallet", GamePhase::Initial);
    attempt.steps[1] = Some(card(5, Suit::Hearts));
    record.initial = Some(attempt);
    assert_eq!(
        record.validate_invariants(),
        Err(PlayerInvariantError::StepsOutOfOrder(GamePhase::Initial))
    );
}

#[test]
fn test_wallet_record_validate_detects_orphan_guess() {
    let mut record = WalletRecord::new("wallet", 7, 0);
    let mut guess = Guess::new("wallet");
    guess.guesses[0] = Some(3);
    record.guess = Some(guess);
    assert_eq!(
        record.validate_invariants(),
        Err(PlayerInvariantError::GuessWithoutCard(1))
    );
}

#[test]
fn test_wallet_record_validate_detects_foreign_attempt() {
    let mut record = WalletRecord::new("wallet", 7, 0);
    record.replay = Some(Attempt::new("someone-else", GamePhase::Replay));
    assert!(matches!(
        record.validate_invariants(),
        Err(PlayerInvariantError::WalletMismatch { .. })
    ));
}

#[test]
fn test_wallet_record_json_keeps_deck_snapshot() {
    let mut record = WalletRecord::new("wallet", 99, 0);
    let mut deck = Deck::standard();
    deck.pop();
    record.player.working_deck = Some(deck.clone());
    let json = serde_json::to_string(&record).unwrap();
    let back: WalletRecord = serde_json::from_str(&json).unwrap();
    assert_eq!(back.player.working_deck, Some(deck));
    assert_eq!(back.player.remaining_cards(), DECK_SIZE - 1);
}

proptest! {
    #[test]
    fn prop_card_new_accepts_exactly_closed_range(value in any::<u8>()) {
        let result = Card::new(value, Suit::Spades);
        prop_assert_eq!(result.is_ok(), (MIN_CARD_VALUE..=MAX_CARD_VALUE).contains(&value));
    }
}
