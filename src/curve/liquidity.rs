use tracing::{debug, info};

use crate::{
    math::FixedMath,
    sequencer::slippage::slippage_bounds,
    types::{
        AmmError, DepositEvent, DepositReceipt, EventReceipt, LiquidityEvent, PoolState, Result,
        WithdrawEvent, WithdrawReceipt,
    },
};

pub fn apply_liquidity(
    math: &FixedMath,
    state: &PoolState,
    event: &LiquidityEvent,
) -> Result<(PoolState, EventReceipt)> {
    match event {
        LiquidityEvent::Deposit(deposit) => {
            apply_deposit(math, state, deposit).map(|(next, r)| (next, EventReceipt::Deposit(r)))
        }
        LiquidityEvent::Withdraw(withdraw) => {
            apply_withdraw(math, state, withdraw).map(|(next, r)| (next, EventReceipt::Withdraw(r)))
        }
    }
}

/// Add liquidity. The first deposit seeds the pool and sets its expected
/// price; later deposits must match the pool ratio within their slippage.
pub fn apply_deposit(
    math: &FixedMath,
    state: &PoolState,
    event: &DepositEvent,
) -> Result<(PoolState, DepositReceipt)> {
    if !event.amount_x.is_positive() || !event.amount_y.is_positive() {
        return Err(AmmError::InvalidEvent(format!(
            "deposit amounts must be positive, got {} and {}",
            math.readable(event.amount_x),
            math.readable(event.amount_y)
        )));
    }

    let mut next = state.clone();
    let seeded = state.is_empty();
    let minted = if seeded {
        next.reserve_x = event.amount_x;
        next.reserve_y = event.amount_y;
        next.expected_price = math.div(event.amount_y, event.amount_x)?;
        next.last_update = event.time;
        next.total_liquidity_tokens = event.amount_x;
        info!(
            "Pool {} seeded by {} with {} / {}",
            state.assets(),
            event.provider,
            math.readable(event.amount_x),
            math.readable(event.amount_y)
        );
        event.amount_x
    } else {
        let expected_y = math.mul_div(event.amount_x, state.reserve_y, state.reserve_x)?;
        let bounds = slippage_bounds(expected_y, event.max_slippage_bips)?;
        if !bounds.contains(event.amount_y) {
            return Err(AmmError::RatioMismatch {
                expected: math.readable(expected_y),
                minimum: math.readable(bounds.minimum),
                maximum: math.readable(bounds.maximum),
                provided: math.readable(event.amount_y),
            });
        }

        let minted = math.mul_div(state.total_liquidity_tokens, event.amount_x, state.reserve_x)?;
        if !minted.is_positive() {
            return Err(AmmError::InvalidEvent("deposit too small to mint liquidity".into()));
        }
        next.reserve_x = math.add(state.reserve_x, event.amount_x)?;
        next.reserve_y = math.add(state.reserve_y, event.amount_y)?;
        next.total_liquidity_tokens = math.add(state.total_liquidity_tokens, minted)?;
        minted
    };

    let balance = math.add(state.balance_of(&event.provider), minted)?;
    next.liquidity_balance.insert(event.provider.clone(), balance);

    debug!(
        "Deposit by {}: minted {}, total {}",
        event.provider,
        math.readable(minted),
        math.readable(next.total_liquidity_tokens)
    );

    let receipt = DepositReceipt {
        provider: event.provider.clone(),
        amount_x: event.amount_x,
        amount_y: event.amount_y,
        minted,
        seeded,
        time: event.time,
    };
    Ok((next, receipt))
}

/// Burn liquidity tokens for a proportional share of both reserves.
pub fn apply_withdraw(
    math: &FixedMath,
    state: &PoolState,
    event: &WithdrawEvent,
) -> Result<(PoolState, WithdrawReceipt)> {
    if !event.liquidity_tokens.is_positive() {
        return Err(AmmError::InvalidEvent(format!(
            "withdrawal must burn a positive amount, got {}",
            math.readable(event.liquidity_tokens)
        )));
    }
    if state.is_empty() {
        return Err(AmmError::EmptyPool);
    }

    let held = state.balance_of(&event.provider);
    if held < event.liquidity_tokens {
        return Err(AmmError::InsufficientBalance {
            provider: event.provider.to_string(),
            held: math.readable(held),
            requested: math.readable(event.liquidity_tokens),
        });
    }

    let (amount_x, amount_y) = state.claim(math, event.liquidity_tokens)?;
    let reserve_x = math.sub(state.reserve_x, amount_x)?;
    let reserve_y = math.sub(state.reserve_y, amount_y)?;
    if !reserve_x.is_positive() || !reserve_y.is_positive() {
        return Err(AmmError::InsufficientReserve(
            "withdrawal would empty the pool".into(),
        ));
    }

    let mut next = state.clone();
    next.reserve_x = reserve_x;
    next.reserve_y = reserve_y;
    next.total_liquidity_tokens = math.sub(state.total_liquidity_tokens, event.liquidity_tokens)?;
    let remaining = math.sub(held, event.liquidity_tokens)?;
    if remaining.is_zero() {
        next.liquidity_balance.remove(&event.provider);
    } else {
        next.liquidity_balance.insert(event.provider.clone(), remaining);
    }

    debug!(
        "Withdrawal by {}: burned {}, received {} / {}",
        event.provider,
        math.readable(event.liquidity_tokens),
        math.readable(amount_x),
        math.readable(amount_y)
    );

    let receipt = WithdrawReceipt {
        provider: event.provider.clone(),
        burned: event.liquidity_tokens,
        amount_x,
        amount_y,
        time: event.time,
    };
    Ok((next, receipt))
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::{
        math::Fixed,
        types::{ALLOWED_SLIPPAGE_BIPS, AssetId, AssetPair, ProviderId, Tick},
    };

    fn empty() -> PoolState {
        PoolState::new(AssetPair::new(AssetId::new("ETH"), AssetId::new("USDC")).unwrap())
    }

    fn deposit(math: &FixedMath, who: &str, x: Decimal, y: Decimal, time: Tick) -> DepositEvent {
        DepositEvent {
            provider: ProviderId::new(who),
            amount_x: math.from_decimal(x).unwrap(),
            amount_y: math.from_decimal(y).unwrap(),
            max_slippage_bips: ALLOWED_SLIPPAGE_BIPS,
            time,
        }
    }

    fn withdraw(math: &FixedMath, who: &str, tokens: Decimal) -> WithdrawEvent {
        WithdrawEvent {
            provider: ProviderId::new(who),
            liquidity_tokens: math.from_decimal(tokens).unwrap(),
            time: 9,
        }
    }

    #[test]
    fn test_seed_deposit() {
        let math = FixedMath::default();
        let (state, receipt) = apply_deposit(&math, &empty(), &deposit(&math, "alice", dec!(100), dec!(250), 5)).unwrap();
        assert!(receipt.seeded);
        assert_eq!(receipt.minted, math.from_int(100).unwrap());
        assert_eq!(state.expected_price(), math.from_decimal(dec!(2.5)).unwrap());
        assert_eq!(state.last_update(), 5);
        assert_eq!(state.total_liquidity_tokens(), math.from_int(100).unwrap());
        assert_eq!(state.balance_of(&ProviderId::new("alice")), math.from_int(100).unwrap());
    }

    #[test]
    fn test_equal_seed_prices_one_to_one() {
        let math = FixedMath::default();
        let (state, _) = apply_deposit(&math, &empty(), &deposit(&math, "alice", dec!(40), dec!(40), 0)).unwrap();
        assert_eq!(state.expected_price(), math.one());
    }

    #[test]
    fn test_seed_rejects_zero_side() {
        let math = FixedMath::default();
        let result = apply_deposit(&math, &empty(), &deposit(&math, "alice", dec!(100), dec!(0), 0));
        assert!(matches!(result, Err(AmmError::InvalidEvent(_))));
    }

    #[test]
    fn test_proportional_deposit() {
        let math = FixedMath::default();
        let (state, _) = apply_deposit(&math, &empty(), &deposit(&math, "alice", dec!(100), dec!(200), 0)).unwrap();
        let (state, receipt) =
            apply_deposit(&math, &state, &deposit(&math, "bob", dec!(50), dec!(101), 7)).unwrap();

        assert!(!receipt.seeded);
        assert_eq!(receipt.minted, math.from_int(50).unwrap());
        assert_eq!(state.reserve_y(), math.from_int(301).unwrap());
        assert_eq!(state.total_liquidity_tokens(), math.from_int(150).unwrap());
        // Liquidity events leave the decay clock alone once seeded.
        assert_eq!(state.last_update(), 0);
        assert_eq!(
            state.pool_share(&math, &ProviderId::new("bob")).unwrap(),
            math.from_ratio(1, 3).unwrap()
        );
    }

    #[test]
    fn test_ratio_mismatch() {
        let math = FixedMath::default();
        let (state, _) = apply_deposit(&math, &empty(), &deposit(&math, "alice", dec!(100), dec!(200), 0)).unwrap();
        // expected 100 +/- 2
        let result = apply_deposit(&math, &state, &deposit(&math, "bob", dec!(50), dec!(103), 1));
        match result {
            Err(AmmError::RatioMismatch { expected, minimum, maximum, provided }) => {
                assert_eq!(expected, "100");
                assert_eq!(minimum, "98");
                assert_eq!(maximum, "102");
                assert_eq!(provided, "103");
            }
            other => panic!("expected ratio mismatch, got {:?}", other),
        }
        assert!(apply_deposit(&math, &state, &deposit(&math, "bob", dec!(50), dec!(98), 1)).is_ok());
    }

    #[test]
    fn test_withdraw() {
        let math = FixedMath::default();
        let (state, _) = apply_deposit(&math, &empty(), &deposit(&math, "alice", dec!(100), dec!(200), 0)).unwrap();
        let (state, _) = apply_deposit(&math, &state, &deposit(&math, "bob", dec!(100), dec!(200), 0)).unwrap();

        let (state, receipt) = apply_withdraw(&math, &state, &withdraw(&math, "bob", dec!(100))).unwrap();
        assert_eq!(receipt.amount_x, math.from_int(100).unwrap());
        assert_eq!(receipt.amount_y, math.from_int(200).unwrap());
        assert!(!state.liquidity_balance().contains_key(&ProviderId::new("bob")));
        assert_eq!(state.total_liquidity_tokens(), math.from_int(100).unwrap());

        let (state, _) = apply_withdraw(&math, &state, &withdraw(&math, "alice", dec!(25))).unwrap();
        assert_eq!(state.balance_of(&ProviderId::new("alice")), math.from_int(75).unwrap());
        assert_eq!(state.reserve_x(), math.from_int(75).unwrap());
    }

    #[test]
    fn test_withdraw_errors() {
        let math = FixedMath::default();
        let (state, _) = apply_deposit(&math, &empty(), &deposit(&math, "alice", dec!(100), dec!(200), 0)).unwrap();

        assert!(matches!(
            apply_withdraw(&math, &state, &withdraw(&math, "bob", dec!(1))),
            Err(AmmError::InsufficientBalance { .. })
        ));
        assert!(matches!(
            apply_withdraw(&math, &state, &withdraw(&math, "alice", dec!(101))),
            Err(AmmError::InsufficientBalance { .. })
        ));
        assert!(matches!(
            apply_withdraw(&math, &state, &withdraw(&math, "alice", dec!(100))),
            Err(AmmError::InsufficientReserve(_))
        ));
        assert!(matches!(
            apply_withdraw(&math, &empty(), &withdraw(&math, "alice", dec!(1))),
            Err(AmmError::EmptyPool)
        ));
        assert!(matches!(
            apply_withdraw(&math, &state, &withdraw(&math, "alice", dec!(0))),
            Err(AmmError::InvalidEvent(_))
        ));
    }

    #[test]
    fn test_liquidity_event_dispatch() {
        let math = FixedMath::default();
        let seed = LiquidityEvent::Deposit(deposit(&math, "alice", dec!(10), dec!(10), 0));
        let (state, receipt) = apply_liquidity(&math, &empty(), &seed).unwrap();
        assert!(matches!(receipt, EventReceipt::Deposit(ref r) if r.seeded));

        let exit = LiquidityEvent::Withdraw(withdraw(&math, "alice", dec!(4)));
        let (state, receipt) = apply_liquidity(&math, &state, &exit).unwrap();
        assert_eq!(receipt.time(), 9);
        assert_eq!(state.reserve_y(), math.from_int(6).unwrap());
    }

    fn sum_of_balances(math: &FixedMath, state: &PoolState) -> Fixed {
        state
            .liquidity_balance()
            .values()
            .fold(Fixed::ZERO, |sum, balance| math.add(sum, *balance).unwrap())
    }

    proptest! {
        #[test]
        fn prop_balances_sum_to_total(
            steps in proptest::collection::vec((any::<bool>(), 0usize..3, 1u32..1_000_000, 1i128..=100), 1..16)
        ) {
            let math = FixedMath::default();
            let seed = deposit(&math, "p0", dec!(1000), dec!(3000), 0);
            let mut state = apply_deposit(&math, &empty(), &seed).unwrap().0;

            for (i, (is_withdrawal, who, amount, percent)) in steps.into_iter().enumerate() {
                let provider = format!("p{}", who);
                if is_withdrawal {
                    let held = state.balance_of(&ProviderId::new(&provider));
                    let tokens = math.mul(held, math.from_ratio(percent, 100).unwrap()).unwrap();
                    if !tokens.is_positive() {
                        continue;
                    }
                    let event = WithdrawEvent {
                        provider: ProviderId::new(&provider),
                        liquidity_tokens: tokens,
                        time: i as Tick,
                    };
                    match apply_withdraw(&math, &state, &event) {
                        Ok((next, _)) => {
                            if tokens == held {
                                prop_assert!(!next.liquidity_balance().contains_key(&event.provider));
                            }
                            state = next;
                        }
                        // Only the last holder can be refused for emptying the pool.
                        Err(AmmError::InsufficientReserve(_)) => {
                            prop_assert_eq!(tokens, state.total_liquidity_tokens());
                        }
                        Err(e) => return Err(TestCaseError::fail(e.to_string())),
                    }
                } else {
                    let x = Decimal::from(amount);
                    let event = deposit(&math, &provider, x, x * dec!(3), i as Tick);
                    state = apply_deposit(&math, &state, &event).unwrap().0;
                }

                prop_assert_eq!(sum_of_balances(&math, &state), state.total_liquidity_tokens());
                prop_assert!(state.reserve_x().is_positive() && state.reserve_y().is_positive());
            }
            prop_assert_eq!(state.expected_price(), math.from_int(3).unwrap());
        }
    }
}
