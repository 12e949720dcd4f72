/// Cards in a standard deck.
pub const DECK_SIZE: usize = 52;

/// Steps (cards) in one attempt.
pub const STEPS_PER_ATTEMPT: usize = 4;

/// Decimals of the staked token (BONK).
pub const TOKEN_DECIMALS: u8 = 5;

/// One whole token in smallest units.
pub const TOKEN_UNIT: u64 = 10u64.pow(TOKEN_DECIMALS as u32);

/// Stake required to register during the initial phase (500 tokens).
pub const REGISTRATION_COST: u64 = 500 * TOKEN_UNIT;

/// Stake required to arm one replay attempt (50 tokens).
pub const ATTEMPT_COST: u64 = 50 * TOKEN_UNIT;

/// Share of a middle-tier stake that is refunded, in percent.
pub const MIDDLE_REFUND_PERCENT: u8 = 70;

/// Platform fee taken from the shared pool, in percent.
pub const PLATFORM_FEE_PERCENT: u8 = 10;

/// Maximum serialized size of one payout batch, in bytes.
pub const BATCH_CEILING_BYTES: usize = 900;

/// Estimated serialized size of one payout transfer, in bytes.
pub const TRANSFER_OPERATION_SIZE: usize = 150;
