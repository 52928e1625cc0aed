pub mod editor;
pub mod format;
pub mod grouping;
pub mod session;
pub mod store;
pub mod supabase_store;
pub mod sync;
pub mod views;

pub use editor::DoctorEditor;
pub use session::{RosterSession, RosterSnapshot};
pub use store::RosterStore;
pub use supabase_store::SupabaseRosterStore;
