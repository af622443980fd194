pub mod drag;
pub mod session;

pub use drag::DragSelection;
pub use session::{natural_fractions, BoxSelection, CalibrationSession, WizardStep};
