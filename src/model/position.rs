use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Long,
    Short,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Long => f.write_str("long"),
            Self::Short => f.write_str("short"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    Stop,
    TakeProfit,
    EndOfData,
}

impl ExitReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stop => "stop",
            Self::TakeProfit => "take_profit",
            Self::EndOfData => "end_of_data",
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single open simulated position of a backtest run.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub side: Side,
    pub entry_price: f64,
    pub entry_time: u64,
    pub qty: f64,
    pub stop_price: f64,
    pub take_profit_price: f64,
}

impl Position {
    /// Open a position sized to the whole of `equity`, with stop and target
    /// placed symmetrically around the entry.
    pub fn open(
        side: Side,
        entry_price: f64,
        entry_time: u64,
        equity: f64,
        stop_loss_pct: f64,
        take_profit_pct: f64,
    ) -> Self {
        let (stop_price, take_profit_price) = match side {
            Side::Long => (
                entry_price * (1.0 - stop_loss_pct),
                entry_price * (1.0 + take_profit_pct),
            ),
            Side::Short => (
                entry_price * (1.0 + stop_loss_pct),
                entry_price * (1.0 - take_profit_pct),
            ),
        };
        Self {
            side,
            entry_price,
            entry_time,
            qty: equity / entry_price,
            stop_price,
            take_profit_price,
        }
    }

    /// Intrabar exit check. The stop wins when both levels fall inside the bar.
    pub fn exit_trigger(&self, high: f64, low: f64) -> Option<(ExitReason, f64)> {
        match self.side {
            Side::Long => {
                if low <= self.stop_price {
                    Some((ExitReason::Stop, self.stop_price))
                } else if high >= self.take_profit_price {
                    Some((ExitReason::TakeProfit, self.take_profit_price))
                } else {
                    None
                }
            }
            Side::Short => {
                if high >= self.stop_price {
                    Some((ExitReason::Stop, self.stop_price))
                } else if low <= self.take_profit_price {
                    Some((ExitReason::TakeProfit, self.take_profit_price))
                } else {
                    None
                }
            }
        }
    }

    pub fn gross_pnl(&self, exit_price: f64) -> f64 {
        match self.side {
            Side::Long => (exit_price - self.entry_price) * self.qty,
            Side::Short => (self.entry_price - exit_price) * self.qty,
        }
    }

    /// Close at `exit_price` (already slippage-adjusted), charging `fee_rate`
    /// on both the entry and the exit notional.
    pub fn close(self, exit_time: u64, exit_price: f64, reason: ExitReason, fee_rate: f64) -> Trade {
        let gross_pnl = self.gross_pnl(exit_price);
        let entry_fee = fee(self.entry_price * self.qty, fee_rate);
        let exit_fee = fee(exit_price * self.qty, fee_rate);
        Trade {
            side: self.side,
            entry_time: self.entry_time,
            entry_price: self.entry_price,
            exit_time,
            exit_price,
            reason,
            gross_pnl,
            net_pnl: gross_pnl - entry_fee - exit_fee,
        }
    }
}

fn fee(notional: f64, fee_rate: f64) -> f64 {
    if fee_rate <= 0.0 {
        return 0.0;
    }
    notional.abs() * fee_rate
}

/// Record of one closed position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub side: Side,
    pub entry_time: u64,
    pub entry_price: f64,
    pub exit_time: u64,
    pub exit_price: f64,
    pub reason: ExitReason,
    pub gross_pnl: f64,
    pub net_pnl: f64,
}

impl Trade {
    pub fn is_win(&self) -> bool {
        self.net_pnl > 0.0
    }
}
