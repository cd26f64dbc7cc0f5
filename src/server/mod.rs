pub mod accounts;
pub mod aggregate;
pub mod daemon;
pub mod documents;
pub mod executor;
pub mod menu;
pub mod rank;
pub mod visibility;
