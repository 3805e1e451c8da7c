pub mod alerts;
pub mod backtest;
pub mod confluence;
pub mod cycles;
pub mod esoteric;
pub mod health;
pub mod prices;
pub mod signals;
