pub mod alerts;
pub mod backtest;
pub mod common;
pub mod confluence;
pub mod cycles;
pub mod domain;
pub mod prices;
