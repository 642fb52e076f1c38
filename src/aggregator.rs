use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::DripError;
use crate::simulator::SimulationState;
use crate::timeline::IncludedLot;

/// Unrounded total-return metrics for a position
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReturnSummary {
    pub cost_basis: Decimal,
    pub current_price: Decimal,
    pub current_value: Decimal,
    pub total_dividends: Decimal,
    pub total_gain_loss: Decimal,
    /// Percentage of cost basis, 0 when nothing was paid for the shares
    pub total_gain_loss_pct: Decimal,
    pub dripped_shares: Decimal,
    pub total_shares: Decimal,
}

/// Cash paid across the included lots. Reinvested shares add nothing here.
pub fn total_cost_basis(lots: &[IncludedLot]) -> Result<Decimal, DripError> {
    lots.iter().try_fold(Decimal::ZERO, |total, lot| {
        lot.cost()
            .and_then(|cost| total.checked_add(cost))
            .ok_or_else(|| DripError::overflow(format!("cost basis at lot #{}", lot.index)))
    })
}

/// Combine the simulator's final state with the latest close.
///
/// Dividends count as investor value whether or not they were reinvested.
pub fn aggregate(
    state: &SimulationState,
    latest_close: Decimal,
    lots: &[IncludedLot],
) -> Result<ReturnSummary, DripError> {
    let cost_basis = total_cost_basis(lots)?;
    let current_value = state
        .shares_held
        .checked_mul(latest_close)
        .ok_or_else(|| DripError::overflow("current value"))?;
    let total_gain_loss = current_value
        .checked_add(state.cash_dividends)
        .and_then(|v| v.checked_sub(cost_basis))
        .ok_or_else(|| DripError::overflow("total gain/loss"))?;
    let total_gain_loss_pct = if cost_basis.is_zero() {
        Decimal::ZERO
    } else {
        total_gain_loss
            .checked_div(cost_basis)
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
            .ok_or_else(|| DripError::overflow("gain/loss percentage"))?
    };

    Ok(ReturnSummary {
        cost_basis,
        current_price: latest_close,
        current_value,
        total_dividends: state.cash_dividends,
        total_gain_loss,
        total_gain_loss_pct,
        dripped_shares: state.reinvested_shares,
        total_shares: state.shares_held,
    })
}
