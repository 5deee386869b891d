//! Declaration surface for distributed command handlers.

use crate::errors::CommandError;
use crate::payload::Mapping;

/// Signature every distributed command callback must have: a single mapping
/// of normalised fields.
pub type NetCommandFn<H> = fn(&H, &Mapping) -> Result<(), CommandError>;

/// One declared distributed command callback.
pub struct NetCommandMethod<H> {
    pub(crate) name: String,
    pub(crate) required: Vec<String>,
    pub(crate) target: NetCommandFn<H>,
}

impl<H> NetCommandMethod<H> {
    /// Declares a callback for `name` requiring each of `required` in the
    /// payload's `data` object.
    pub fn new<I, S>(name: impl Into<String>, required: I, target: NetCommandFn<H>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into().trim().to_owned(),
            required: required.into_iter().map(Into::into).collect(),
            target,
        }
    }

    /// Command name the callback subscribes to.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared required field names.
    pub fn required(&self) -> &[String] {
        &self.required
    }
}

/// An object servicing distributed commands.
pub trait NetCommandHandler: Send + Sync + Sized + 'static {
    /// Lists the callbacks this handler registers.
    fn net_commands(&self) -> Vec<NetCommandMethod<Self>>;
}
