pub mod draft;

pub use draft::{
    generate_picks, AuctionSettings, Draft, DraftPick, DraftSettings, DraftStatus, DraftType,
};
