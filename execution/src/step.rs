//! Player choices and the per-step predicates.
//!
//! Every predicate is a pure function of the choice, the drawn card and the
//! cards already in the attempt.

use ridethebus_types::game::{Attempt, Card, Color, Step, Suit};

use crate::GameError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Higher,
    Lower,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Range {
    Inside,
    Outside,
}

/// A validated choice for one step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Choice {
    Color(Color),
    Direction(Direction),
    Range(Range),
    Suit(Suit),
    /// Show earlier cards without drawing (steps 2 and 3 only).
    Review,
}

impl Choice {
    /// Parses the raw query value for `step`. Anything outside the step's
    /// closed choice set is `InvalidChoice`.
    pub fn parse(step: Step, raw: &str) -> Result<Self, GameError> {
        let normalized = raw.trim().to_ascii_lowercase();
        let choice = match (step, normalized.as_str()) {
            (Step::HighLow | Step::InsideOutside, "review") => Some(Choice::Review),
            (Step::RedBlack, _) => normalized.parse::<Color>().ok().map(Choice::Color),
            (Step::HighLow, "higher") => Some(Choice::Direction(Direction::Higher)),
            (Step::HighLow, "lower") => Some(Choice::Direction(Direction::Lower)),
            (Step::InsideOutside, "inside") => Some(Choice::Range(Range::Inside)),
            (Step::InsideOutside, "outside") => Some(Choice::Range(Range::Outside)),
            (Step::Suit, _) => normalized.parse::<Suit>().ok().map(Choice::Suit),
            _ => None,
        };
        choice.ok_or_else(|| GameError::InvalidChoice {
            step: step.name(),
            choice: raw.to_string(),
        })
    }

    pub fn is_review(&self) -> bool {
        matches!(self, Choice::Review)
    }

    pub fn label(&self) -> String {
        match self {
            Choice::Color(color) => color.to_string(),
            Choice::Direction(Direction::Higher) => "higher".to_string(),
            Choice::Direction(Direction::Lower) => "lower".to_string(),
            Choice::Range(Range::Inside) => "inside".to_string(),
            Choice::Range(Range::Outside) => "outside".to_string(),
            Choice::Suit(suit) => suit.as_str().to_string(),
            Choice::Review => "review".to_string(),
        }
    }
}

pub fn color_matches(color: Color, card: Card) -> bool {
    card.color() == color
}

/// Equal values lose for both directions.
pub fn direction_matches(direction: Direction, first: Card, card: Card) -> bool {
    match direction {
        Direction::Higher => card.value() > first.value(),
        Direction::Lower => card.value() < first.value(),
    }
}

/// A card on either bound is neither inside nor outside.
pub fn range_matches(range: Range, first: Card, second: Card, card: Card) -> bool {
    let low = first.value().min(second.value());
    let high = first.value().max(second.value());
    let value = card.value();
    match range {
        Range::Inside => low < value && value < high,
        Range::Outside => value < low || value > high,
    }
}

pub fn suit_matches(suit: Suit, card: Card) -> bool {
    card.suit() == suit
}

/// Evaluates `choice` for `step` against the freshly drawn `card`.
///
/// The attempt must already hold every earlier step's card.
pub fn evaluate(
    step: Step,
    choice: Choice,
    attempt: &Attempt,
    card: Card,
) -> Result<bool, GameError> {
    let earlier = |s: Step| {
        attempt.card(s).ok_or_else(|| {
            GameError::OutOfOrder(format!("play {} before {}", s.name(), step.name()))
        })
    };
    let correct = match (step, choice) {
        (Step::RedBlack, Choice::Color(color)) => color_matches(color, card),
        (Step::HighLow, Choice::Direction(direction)) => {
            direction_matches(direction, earlier(Step::RedBlack)?, card)
        }
        (Step::InsideOutside, Choice::Range(range)) => range_matches(
            range,
            earlier(Step::RedBlack)?,
            earlier(Step::HighLow)?,
            card,
        ),
        (Step::Suit, Choice::Suit(suit)) => suit_matches(suit, card),
        _ => {
            return Err(GameError::InvalidChoice {
                step: step.name(),
                choice: choice.label(),
            })
        }
    };
    Ok(correct)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ridethebus_types::game::GamePhase;

    fn card(value: u8, suit: Suit) -> Card {
        Card::new(value, suit).unwrap()
    }

    #[test]
    fn test_parse_choices_per_step() {
        assert_eq!(
            Choice::parse(Step::RedBlack, "BLACK").unwrap(),
            Choice::Color(Color::Black)
        );
        assert_eq!(
            Choice::parse(Step::HighLow, "Higher").unwrap(),
            Choice::Direction(Direction::Higher)
        );
        assert_eq!(
            Choice::parse(Step::InsideOutside, "outside").unwrap(),
            Choice::Range(Range::Outside)
        );
        assert_eq!(
            Choice::parse(Step::Suit, "diamonds").unwrap(),
            Choice::Suit(Suit::Diamonds)
        );
        assert_eq!(Choice::parse(Step::HighLow, "review").unwrap(), Choice::Review);
        assert_eq!(
            Choice::parse(Step::InsideOutside, "review").unwrap(),
            Choice::Review
        );
    }

    #[test]
    fn test_parse_rejects_values_outside_the_step() {
        for (step, raw) in [
            (Step::RedBlack, "review"),
            (Step::RedBlack, "higher"),
            (Step::HighLow, "inside"),
            (Step::InsideOutside, "RED"),
            (Step::Suit, "review"),
            (Step::Suit, "stars"),
        ] {
            assert!(
                matches!(Choice::parse(step, raw), Err(GameError::InvalidChoice { .. })),
                "{raw} should be rejected for {step:?}"
            );
        }
    }

    #[test]
    fn test_color_predicate() {
        assert!(color_matches(Color::Black, card(2, Suit::Clubs)));
        assert!(color_matches(Color::Black, card(2, Suit::Spades)));
        assert!(color_matches(Color::Red, card(2, Suit::Hearts)));
        assert!(!color_matches(Color::Red, card(2, Suit::Spades)));
    }

    #[test]
    fn test_direction_predicate_equal_always_loses() {
        let first = card(7, Suit::Clubs);
        assert!(direction_matches(Direction::Higher, first, card(8, Suit::Hearts)));
        assert!(direction_matches(Direction::Lower, first, card(6, Suit::Hearts)));
        assert!(!direction_matches(Direction::Higher, first, card(7, Suit::Hearts)));
        assert!(!direction_matches(Direction::Lower, first, card(7, Suit::Hearts)));
    }

    #[test]
    fn test_range_predicate_bounds_lose_both_ways() {
        let first = card(10, Suit::Clubs);
        let second = card(4, Suit::Hearts);
        assert!(range_matches(Range::Inside, first, second, card(7, Suit::Spades)));
        assert!(range_matches(Range::Outside, first, second, card(2, Suit::Spades)));
        assert!(range_matches(Range::Outside, first, second, card(14, Suit::Spades)));
        for bound in [4, 10] {
            let drawn = card(bound, Suit::Diamonds);
            assert!(!range_matches(Range::Inside, first, second, drawn));
            assert!(!range_matches(Range::Outside, first, second, drawn));
        }
    }

    #[test]
    fn test_suit_predicate() {
        assert!(suit_matches(Suit::Hearts, card(3, Suit::Hearts)));
        assert!(!suit_matches(Suit::Hearts, card(3, Suit::Diamonds)));
    }

    #[test]
    fn test_evaluate_is_pure() {
        let mut attempt = Attempt::new("w", GamePhase::Initial);
        attempt.steps[0] = Some(card(5, Suit::Clubs));
        let drawn = card(9, Suit::Hearts);
        let choice = Choice::Direction(Direction::Higher);
        let first = evaluate(Step::HighLow, choice, &attempt, drawn).unwrap();
        let second = evaluate(Step::HighLow, choice, &attempt, drawn).unwrap();
        assert!(first);
        assert_eq!(first, second);
    }

    #[test]
    fn test_evaluate_rejects_mismatched_choice() {
        let attempt = Attempt::new("w", GamePhase::Initial);
        let result = evaluate(
            Step::RedBlack,
            Choice::Suit(Suit::Hearts),
            &attempt,
            card(5, Suit::Hearts),
        );
        assert!(matches!(result, Err(GameError::InvalidChoice { .. })));
    }
}
