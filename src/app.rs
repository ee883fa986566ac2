use std::ops::Deref;
use std::sync::Arc;

use crate::browser::KeyBrowser;
use crate::counter::VisitCounter;

pub struct AppData<S>(Arc<RuntimeData<S>>);

impl<S> From<RuntimeData<S>> for AppData<S> {
    fn from(data: RuntimeData<S>) -> Self {
        Self(Arc::new(data))
    }
}

impl<S> Clone for AppData<S> {
    fn clone(&self) -> Self {
        AppData(Arc::clone(&self.0))
    }
}

impl<S> Deref for AppData<S> {
    type Target = Arc<RuntimeData<S>>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(typed_builder::TypedBuilder)]
pub struct RuntimeData<S> {
    pub counter: VisitCounter<S>,
    pub browser: KeyBrowser<S>,
    /// Origin allowed to report visits; `*` admits anything (debug mode).
    pub allowed_origin: String,
    /// Shared secret for the admin endpoint. Unset rejects every request.
    pub dashboard_token: Option<String>,
}
