/// On-screen overlay for the identification session.
///
/// Called from both the capture producer (bounding box follows every
/// frame) and the worker (name follows each completed analysis), so
/// implementations must be thread-safe. Rendering itself is out of
/// scope for the core.
pub trait Presenter: Send + Sync {
    /// Draws the face bounding box; an all-zero box clears it.
    fn show_box(&self, left: i32, top: i32, right: i32, bottom: i32);

    /// Shows the recognized name, or clears it with `None`.
    /// `confirmed` distinguishes a liveness-confirmed identity from a
    /// provisional match.
    fn show_name(&self, name: Option<&str>, confirmed: bool);
}

/// Discards all overlay updates.
pub struct NullPresenter;

impl Presenter for NullPresenter {
    fn show_box(&self, _left: i32, _top: i32, _right: i32, _bottom: i32) {}
    fn show_name(&self, _name: Option<&str>, _confirmed: bool) {}
}

/// Logs overlay updates, for headless runs.
pub struct LogPresenter;

impl Presenter for LogPresenter {
    fn show_box(&self, left: i32, top: i32, right: i32, bottom: i32) {
        if (left, top, right, bottom) == (0, 0, 0, 0) {
            log::trace!("box cleared");
        } else {
            log::trace!("box ({left}, {top}) - ({right}, {bottom})");
        }
    }

    fn show_name(&self, name: Option<&str>, confirmed: bool) {
        match name {
            Some(name) if confirmed => log::info!("identified {name} (confirmed)"),
            Some(name) => log::info!("identified {name} (unconfirmed)"),
            None => log::debug!("name cleared"),
        }
    }
}
