//! Whole-game walkthrough across all three phases and settlement.
//!
//! Decks are fixed per player so every draw is known up front.

#[cfg(test)]
mod tests {
    use crate::guess::{self, CardCensus};
    use crate::payout::Stake;
    use crate::step::Choice;
    use crate::{plan_settlement, GameError, PhaseMachine, SettlementConfig, Standings, Transition};
    use ridethebus_types::game::{
        AttemptState, Card, Deck, GamePhase, Step, Suit, Tier, WalletRecord, ATTEMPT_COST,
        REGISTRATION_COST,
    };

    fn deck(top_first: &[(u8, Suit)]) -> Deck {
        let mut cards: Vec<Card> = top_first
            .iter()
            .map(|(value, suit)| Card::new(*value, *suit).unwrap())
            .collect();
        cards.reverse();
        Deck::from_cards(cards).unwrap()
    }

    /// Stands in for the payment webhook.
    fn confirm(record: &mut WalletRecord) {
        record.player.staked += record.pending.pending_amount;
        record.pending.pending_amount = 0;
    }

    fn play_all(
        machine: &PhaseMachine,
        phase: GamePhase,
        record: &mut WalletRecord,
        choices: [&str; 4],
    ) -> Vec<Transition> {
        Step::ALL
            .iter()
            .zip(choices)
            .map(|(step, raw)| {
                let choice = Choice::parse(*step, raw).unwrap();
                machine
                    .play_step(phase, phase, Some(record), *step, choice)
                    .unwrap()
                    .transition
            })
            .collect()
    }

    fn standings(records: &[WalletRecord]) -> Standings {
        Standings::from_points(records.iter().map(|r| r.player.points)).unwrap()
    }

    #[test]
    fn test_full_game() {
        let machine = PhaseMachine::default();
        let mut records: Vec<WalletRecord> = ["alice", "bob", "carol"]
            .iter()
            .enumerate()
            .map(|(seed, wallet)| {
                machine
                    .register(GamePhase::Initial, None, wallet, seed as u64)
                    .unwrap()
            })
            .collect();
        for record in &mut records {
            assert_eq!(record.pending.pending_amount, REGISTRATION_COST);
            confirm(record);
        }

        records[0].player.working_deck = Some(deck(&[
            (2, Suit::Clubs),
            (9, Suit::Hearts),
            (5, Suit::Diamonds),
            (3, Suit::Spades),
        ]));
        records[1].player.working_deck = Some(deck(&[
            (2, Suit::Spades),
            (9, Suit::Hearts),
            (5, Suit::Diamonds),
            (3, Suit::Spades),
        ]));
        records[2].player.working_deck = Some(deck(&[
            (4, Suit::Hearts),
            (4, Suit::Clubs),
            (12, Suit::Diamonds),
            (3, Suit::Spades),
            (13, Suit::Spades),
            (14, Suit::Spades),
            (8, Suit::Spades),
            (9, Suit::Spades),
            (10, Suit::Diamonds),
        ]));

        // Phase 1.
        let transitions = play_all(
            &machine,
            GamePhase::Initial,
            &mut records[0],
            ["BLACK", "higher", "inside", "spades"],
        );
        assert_eq!(
            transitions.last(),
            Some(&Transition::Advanced(AttemptState::Step4Done))
        );
        play_all(
            &machine,
            GamePhase::Initial,
            &mut records[1],
            ["RED", "higher", "outside", "hearts"],
        );
        play_all(
            &machine,
            GamePhase::Initial,
            &mut records[2],
            ["BLACK", "higher", "inside", "hearts"],
        );
        let points: Vec<u32> = records.iter().map(|r| r.player.points).collect();
        assert_eq!(points, vec![4, 1, 0]);

        // Phase 2: alice and bob both drew a 2 first.
        let census = CardCensus::from_records(&records);
        let outcome = guess::submit_guess(
            GamePhase::Guessing,
            Some(&mut records[0]),
            Step::RedBlack,
            2,
            &census,
        )
        .unwrap();
        assert_eq!(outcome.actual, 2);
        assert_eq!(outcome.delta_points, 5);
        guess::submit_guess(
            GamePhase::Guessing,
            Some(&mut records[1]),
            Step::RedBlack,
            100,
            &census,
        )
        .unwrap();
        let points: Vec<u32> = records.iter().map(|r| r.player.points).collect();
        assert_eq!(points, vec![9, 1, 0]);

        // Phase 3: only carol is at the bottom.
        let current = standings(&records);
        assert_eq!(current.tier_of(records[2].player.points), Tier::Bottom);
        let err = machine
            .start_replay(GamePhase::Replay, Some(&mut records[1]), Some(&current))
            .unwrap_err();
        assert_eq!(err, GameError::NotBottomTier);

        let cost = machine
            .start_replay(GamePhase::Replay, Some(&mut records[2]), Some(&current))
            .unwrap();
        assert_eq!(cost, ATTEMPT_COST);
        confirm(&mut records[2]);
        play_all(
            &machine,
            GamePhase::Replay,
            &mut records[2],
            ["BLACK", "higher", "outside", "spades"],
        );
        assert_eq!(records[2].player.points, 1);
        assert_eq!(records[2].player.remaining_cards(), 1);

        // Bob and carol now share the bottom; carol's deck cannot fund more.
        let current = standings(&records);
        assert_eq!(current.bottom_count, 2);
        let err = machine
            .start_replay(GamePhase::Replay, Some(&mut records[2]), Some(&current))
            .unwrap_err();
        assert_eq!(err, GameError::ExhaustedTerminal { remaining: 1 });

        for record in &records {
            record.validate_invariants().unwrap();
        }

        // Settlement.
        let stakes: Vec<Stake> = records
            .iter()
            .map(|r| Stake {
                wallet: r.player.wallet.clone(),
                points: r.player.points,
                staked: r.player.staked,
            })
            .collect();
        let plan = plan_settlement(&stakes, &SettlementConfig::default());
        let pool = u128::from(REGISTRATION_COST * 2 + ATTEMPT_COST);
        assert_eq!(plan.summary.shared_pool, pool);
        assert_eq!(plan.summary.platform_fee, pool / 10);
        assert_eq!(plan.transfer_count(), 1);
        let transfer = &plan.batches[0].operations[0];
        assert_eq!(transfer.wallet, "alice");
        assert_eq!(
            u128::from(transfer.amount),
            u128::from(REGISTRATION_COST) + pool - pool / 10
        );
    }
}
