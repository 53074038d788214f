//! What the core needs from the UI shell around it.

pub mod routes {
    pub const FEED: &str = "/";
    pub const TEMPLATES: &str = "/templates";
}

pub trait Host {
    /// Ask the user to confirm a destructive action.
    fn confirm(&self, prompt: &str) -> bool;

    /// Show a transient error notification.
    fn notify_error(&self, message: &str);

    fn navigate(&self, route: &str);
}

impl<H: Host + ?Sized> Host for &H {
    fn confirm(&self, prompt: &str) -> bool {
        (**self).confirm(prompt)
    }

    fn notify_error(&self, message: &str) {
        (**self).notify_error(message)
    }

    fn navigate(&self, route: &str) {
        (**self).navigate(route)
    }
}
