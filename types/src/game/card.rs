//! Playing cards and decks.
//!
//! Card values run `2..=14` with Ace high (14). Suits and colors parse
//! case-insensitively from their names; anything outside the closed set is
//! rejected at parse or deserialize time.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

use super::DECK_SIZE;

/// Lowest card value (deuce).
pub const MIN_CARD_VALUE: u8 = 2;

/// Highest card value (ace).
pub const MAX_CARD_VALUE: u8 = 14;

#[derive(Debug, Clone, ThisError, PartialEq, Eq)]
pub enum CardError {
    #[error("card value out of range (got={0}, expected 2..=14)")]
    InvalidValue(u8),
    #[error("unknown suit: {0}")]
    UnknownSuit(String),
    #[error("unknown color: {0}")]
    UnknownColor(String),
    #[error("card display mismatch (got={got}, expected={expected})")]
    DisplayMismatch { got: String, expected: String },
    #[error("duplicate card in deck: {0}")]
    DuplicateCard(Card),
    #[error("deck too large (len={0}, max=52)")]
    DeckTooLarge(usize),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Suit {
    Hearts,
    Diamonds,
    Clubs,
    Spades,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Hearts, Suit::Diamonds, Suit::Clubs, Suit::Spades];

    pub fn color(self) -> Color {
        match self {
            Suit::Hearts | Suit::Diamonds => Color::Red,
            Suit::Clubs | Suit::Spades => Color::Black,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Suit::Hearts => '♥',
            Suit::Diamonds => '♦',
            Suit::Clubs => '♣',
            Suit::Spades => '♠',
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Suit::Hearts => "hearts",
            Suit::Diamonds => "diamonds",
            Suit::Clubs => "clubs",
            Suit::Spades => "spades",
        }
    }
}

impl FromStr for Suit {
    type Err = CardError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "hearts" => Ok(Suit::Hearts),
            "diamonds" => Ok(Suit::Diamonds),
            "clubs" => Ok(Suit::Clubs),
            "spades" => Ok(Suit::Spades),
            _ => Err(CardError::UnknownSuit(raw.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Color {
    Red,
    Black,
}

impl FromStr for Color {
    type Err = CardError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "RED" => Ok(Color::Red),
            "BLACK" => Ok(Color::Black),
            _ => Err(CardError::UnknownColor(raw.to_string())),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::Red => f.write_str("RED"),
            Color::Black => f.write_str("BLACK"),
        }
    }
}

/// A single playing card.
///
/// Serialized as `{ value, suit, display }`; the display string is derived and
/// checked on the way back in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "CardRepr", try_from = "CardRepr")]
pub struct Card {
    value: u8,
    suit: Suit,
}

impl Card {
    pub fn new(value: u8, suit: Suit) -> Result<Self, CardError> {
        if !(MIN_CARD_VALUE..=MAX_CARD_VALUE).contains(&value) {
            return Err(CardError::InvalidValue(value));
        }
        Ok(Self { value, suit })
    }

    pub fn value(&self) -> u8 {
        self.value
    }

    pub fn suit(&self) -> Suit {
        self.suit
    }

    pub fn color(&self) -> Color {
        self.suit.color()
    }

    /// Human readable label, e.g. `10♥` or `A♠`.
    pub fn display(&self) -> String {
        format!("{}{}", rank_label(self.value), self.suit.symbol())
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", rank_label(self.value), self.suit.symbol())
    }
}

fn rank_label(value: u8) -> &'static str {
    match value {
        2 => "2",
        3 => "3",
        4 => "4",
        5 => "5",
        6 => "6",
        7 => "7",
        8 => "8",
        9 => "9",
        10 => "10",
        11 => "J",
        12 => "Q",
        13 => "K",
        14 => "A",
        _ => "?",
    }
}

#[derive(Serialize, Deserialize)]
struct CardRepr {
    value: u8,
    suit: Suit,
    #[serde(default)]
    display: Option<String>,
}

impl From<Card> for CardRepr {
    fn from(card: Card) -> Self {
        Self {
            value: card.value,
            suit: card.suit,
            display: Some(card.display()),
        }
    }
}

impl TryFrom<CardRepr> for Card {
    type Error = CardError;

    fn try_from(repr: CardRepr) -> Result<Self, Self::Error> {
        let card = Card::new(repr.value, repr.suit)?;
        if let Some(display) = repr.display {
            let expected = card.display();
            if display != expected {
                return Err(CardError::DisplayMismatch {
                    got: display,
                    expected,
                });
            }
        }
        Ok(card)
    }
}

/// An ordered stack of unique cards. The last element is the top of the stack.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "Vec<Card>", try_from = "Vec<Card>")]
pub struct Deck {
    cards: Vec<Card>,
}

impl Deck {
    /// The 52-card set in suit-major order.
    pub fn standard() -> Self {
        let cards = Suit::ALL
            .iter()
            .flat_map(|&suit| {
                (MIN_CARD_VALUE..=MAX_CARD_VALUE).map(move |value| Card { value, suit })
            })
            .collect();
        Self { cards }
    }

    /// Builds a deck from an explicit bottom-to-top ordering.
    pub fn from_cards(cards: Vec<Card>) -> Result<Self, CardError> {
        if cards.len() > DECK_SIZE {
            return Err(CardError::DeckTooLarge(cards.len()));
        }
        let mut seen = HashSet::with_capacity(cards.len());
        for card in &cards {
            if !seen.insert(*card) {
                return Err(CardError::DuplicateCard(*card));
            }
        }
        Ok(Self { cards })
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    /// Mutable access for in-place permutation. Length and membership must not change.
    pub fn as_mut_slice(&mut self) -> &mut [Card] {
        &mut self.cards
    }

    /// Removes the top card.
    pub fn pop(&mut self) -> Option<Card> {
        self.cards.pop()
    }

    pub fn peek(&self) -> Option<&Card> {
        self.cards.last()
    }
}

impl From<Deck> for Vec<Card> {
    fn from(deck: Deck) -> Self {
        deck.cards
    }
}

impl TryFrom<Vec<Card>> for Deck {
    type Error = CardError;

    fn try_from(cards: Vec<Card>) -> Result<Self, Self::Error> {
        Deck::from_cards(cards)
    }
}
