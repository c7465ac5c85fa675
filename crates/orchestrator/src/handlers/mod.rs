pub mod draft;
pub mod draft_pick;
pub mod health;
