//! Buy / sell against a user ledger, and portfolio valuation.
//!
//! Both trade functions validate everything before touching state and
//! return an updated copy, so a rejected trade leaves the caller's ledger
//! exactly as it was.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::core::{Amount, Error, Result, Symbol, checked_total, round_cents};
use crate::ledger::UserLedger;
use crate::market::Instruments;

/// Confirmation details of a completed trade.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeReceipt {
    pub symbol: Symbol,
    pub price: Decimal,
    /// Shares bought or sold
    pub shares: Decimal,
    /// Beaned Bucks spent (buy) or received (sell)
    pub cash: Decimal,
    pub holding_after: Decimal,
    pub balance_after: Decimal,
}

fn quote(instruments: &Instruments, symbol: &Symbol) -> Result<Decimal> {
    instruments
        .get(symbol)
        .filter(|price| *price > Decimal::ZERO)
        .ok_or_else(|| Error::InvalidSymbol(symbol.to_string()))
}

/// Invest `amount` Beaned Bucks (or the whole balance) in `symbol`.
pub fn buy(
    ledger: &UserLedger,
    instruments: &Instruments,
    symbol: &Symbol,
    amount: Amount,
) -> Result<(UserLedger, TradeReceipt)> {
    let price = quote(instruments, symbol)?;
    let spend = amount.resolve(ledger.balance);
    if spend <= Decimal::ZERO {
        return Err(Error::InvalidAmount(format!("{spend} must be greater than 0")));
    }
    if spend > ledger.balance {
        return Err(Error::InsufficientFunds {
            available: ledger.balance,
            required: spend,
        });
    }

    let shares = spend
        .checked_div(price)
        .ok_or_else(|| Error::InvalidAmount(format!("{spend} buys too many shares at {price}")))?;
    let mut next = ledger.clone();
    next.balance -= spend;
    let holding = next.portfolio.entry(symbol.clone()).or_insert(Decimal::ZERO);
    *holding = checked_total(*holding, shares)?;
    let holding_after = *holding;
    next.total_spent = checked_total(ledger.total_spent, spend)?;

    let receipt = TradeReceipt {
        symbol: symbol.clone(),
        price,
        shares,
        cash: spend,
        holding_after,
        balance_after: next.balance,
    };
    Ok((next, receipt))
}

/// Sell `quantity` shares (or the whole holding) of `symbol`.
pub fn sell(
    ledger: &UserLedger,
    instruments: &Instruments,
    symbol: &Symbol,
    quantity: Amount,
) -> Result<(UserLedger, TradeReceipt)> {
    let price = quote(instruments, symbol)?;
    let held = ledger
        .portfolio
        .get(symbol)
        .copied()
        .ok_or_else(|| Error::NotOwned(symbol.to_string()))?;
    let shares = quantity.resolve(held);
    if shares <= Decimal::ZERO {
        return Err(Error::InvalidQuantity(format!("{shares} must be greater than 0")));
    }
    if shares > held {
        return Err(Error::InsufficientShares {
            held,
            requested: shares,
        });
    }

    let proceeds = round_cents(
        price
            .checked_mul(shares)
            .ok_or_else(|| Error::InvalidQuantity(format!("{shares} shares are worth too much")))?,
    );
    let mut next = ledger.clone();
    let remaining = held - shares;
    if remaining <= Decimal::ZERO {
        next.portfolio.remove(symbol);
    } else {
        next.portfolio.insert(symbol.clone(), remaining);
    }
    next.balance = checked_total(ledger.balance, proceeds)?;
    next.total_earned = checked_total(ledger.total_earned, proceeds)?;

    let receipt = TradeReceipt {
        symbol: symbol.clone(),
        price,
        shares,
        cash: proceeds,
        holding_after: remaining.max(Decimal::ZERO),
        balance_after: next.balance,
    };
    Ok((next, receipt))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoldingValue {
    pub symbol: Symbol,
    pub shares: Decimal,
    pub price: Decimal,
    pub value: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioSummary {
    pub balance: Decimal,
    pub holdings: Vec<HoldingValue>,
    pub total_value: Decimal,
    pub total_spent: Decimal,
    pub total_earned: Decimal,
    pub net_profit: Decimal,
}

/// Value every holding at current prices. Delisted symbols price at 0.
pub fn portfolio_summary(ledger: &UserLedger, instruments: &Instruments) -> PortfolioSummary {
    let holdings: Vec<HoldingValue> = ledger
        .portfolio
        .iter()
        .map(|(symbol, shares)| {
            let price = instruments.get(symbol).unwrap_or(Decimal::ZERO);
            HoldingValue {
                symbol: symbol.clone(),
                shares: *shares,
                price,
                value: round_cents(price * *shares),
            }
        })
        .collect();
    let total_value = round_cents(
        ledger
            .portfolio
            .iter()
            .map(|(symbol, shares)| instruments.get(symbol).unwrap_or(Decimal::ZERO) * *shares)
            .sum(),
    );

    PortfolioSummary {
        balance: ledger.balance,
        holdings,
        total_value,
        total_spent: ledger.total_spent,
        total_earned: ledger.total_earned,
        net_profit: ledger.net_profit(),
    }
}

impl std::fmt::Display for PortfolioSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.holdings.is_empty() {
            writeln!(f, "No stock holdings found.")?;
        }
        for holding in &self.holdings {
            writeln!(
                f,
                "{}: {} shares @ {:.2} = {:.2}",
                holding.symbol, holding.shares, holding.price, holding.value
            )?;
        }
        writeln!(f, "Total Holdings Value: {:.2}", self.total_value)?;
        writeln!(
            f,
            "Invested: {:.2} | Earned: {:.2} | Net Profit: {:.2}",
            self.total_spent, self.total_earned, self.net_profit
        )?;
        write!(f, "Balance: {:.2} Beaned Bucks", self.balance)
    }
}
