use std::fmt;

use serde::Serialize;

use crate::model::position::Trade;

/// Outcome of a backtest run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestResult {
    pub candles: usize,
    pub trades: Vec<Trade>,
    pub initial_equity: f64,
    pub final_equity: f64,
    /// Fraction of initial equity.
    pub total_return: f64,
    /// Largest peak-to-trough equity decline, as a fraction of the peak.
    pub max_drawdown: f64,
    pub win_rate: f64,
    pub profit_factor: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TradeStats {
    pub wins: usize,
    pub losses: usize,
    pub gross_win: f64,
    pub gross_loss: f64,
}

impl TradeStats {
    pub fn from_trades(trades: &[Trade]) -> Self {
        trades.iter().fold(Self::default(), |mut acc, t| {
            if t.net_pnl > 0.0 {
                acc.wins += 1;
                acc.gross_win += t.net_pnl;
            } else if t.net_pnl < 0.0 {
                acc.losses += 1;
                acc.gross_loss += -t.net_pnl;
            }
            acc
        })
    }

    pub fn win_rate(&self, total_trades: usize) -> f64 {
        if total_trades == 0 {
            0.0
        } else {
            self.wins as f64 / total_trades as f64
        }
    }

    /// Winning PnL over losing PnL; 0 when nothing was lost.
    pub fn profit_factor(&self) -> f64 {
        if self.gross_loss > 0.0 {
            self.gross_win / self.gross_loss
        } else {
            0.0
        }
    }
}

impl BacktestResult {
    pub fn from_run(
        candles: usize,
        trades: Vec<Trade>,
        initial_equity: f64,
        final_equity: f64,
        max_drawdown: f64,
    ) -> Self {
        let stats = TradeStats::from_trades(&trades);
        Self {
            candles,
            win_rate: stats.win_rate(trades.len()),
            profit_factor: stats.profit_factor(),
            trades,
            initial_equity,
            final_equity,
            total_return: (final_equity - initial_equity) / initial_equity,
            max_drawdown,
        }
    }
}

impl fmt::Display for BacktestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Candles: {}", self.candles)?;
        writeln!(f, "Trades: {}", self.trades.len())?;
        writeln!(f, "Final equity: {:.2}", self.final_equity)?;
        writeln!(f, "Total return: {:.2}%", self.total_return * 100.0)?;
        writeln!(f, "Max drawdown: {:.2}%", self.max_drawdown * 100.0)?;
        writeln!(f, "Win rate: {:.2}%", self.win_rate * 100.0)?;
        write!(f, "Profit factor: {:.3}", self.profit_factor)
    }
}
