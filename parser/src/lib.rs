//! Text parsing shared by the webhook handlers.

pub mod ignore_block;
pub mod mentions;

pub use mentions::get_mentions;
