//! Database attachments.

use crate::client::Client;
use crate::engine::{AttachmentHandle, TimeZoneRules};
use crate::error::{Error, Result, ResultExt};
use crate::protocol::constants::*;
use crate::protocol::xpb::ParameterBlock;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Options used when attaching to or creating a database.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttachmentOptions {
    /// Connection character set (`isc_dpb_lc_ctype`).
    pub connection_charset: Option<String>,
    pub user_name: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    /// Raw DPB bytes the named options are appended to.
    pub dpb: Vec<u8>,
    /// Create the database instead of attaching to an existing one.
    pub create_database: bool,
}

impl AttachmentOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_connection_charset(mut self, charset: impl Into<String>) -> Self {
        self.connection_charset = Some(charset.into());
        self
    }

    pub fn with_user_name(mut self, user_name: impl Into<String>) -> Self {
        self.user_name = Some(user_name.into());
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn with_dpb(mut self, dpb: impl Into<Vec<u8>>) -> Self {
        self.dpb = dpb.into();
        self
    }

    pub fn with_create_database(mut self, create: bool) -> Self {
        self.create_database = create;
        self
    }

    /// Render the database parameter block.
    pub fn to_dpb(&self) -> Result<Vec<u8>> {
        let mut block = if self.dpb.is_empty() {
            ParameterBlock::new(ISC_DPB_VERSION1)
        } else {
            ParameterBlock::from_raw(&self.dpb)
        };
        let strings = [
            (ISC_DPB_LC_CTYPE, &self.connection_charset),
            (ISC_DPB_USER_NAME, &self.user_name),
            (ISC_DPB_PASSWORD, &self.password),
            (ISC_DPB_SQL_ROLE_NAME, &self.role),
        ];
        for (tag, value) in strings {
            if let Some(value) = value {
                block.insert_string(tag, value)?;
            }
        }
        Ok(block.into_vec())
    }
}

/// A connection to one database.
///
/// Transactions and statements borrow the attachment, so it always outlives
/// them. Dropping a still-attached `Attachment` detaches and logs, rather
/// than returns, any failure.
pub struct Attachment {
    client: Client,
    uri: String,
    zone_rules: Arc<dyn TimeZoneRules>,
    handle: Option<Box<dyn AttachmentHandle>>,
}

impl Attachment {
    /// Attach to `uri`, or create it when `options.create_database` is set.
    pub fn connect(client: &Client, uri: &str, options: &AttachmentOptions) -> Result<Self> {
        let dpb = options.to_dpb()?;
        let handle = if options.create_database {
            client
                .engine()
                .create_database(uri, &dpb)
                .context("Attachment::create", uri)?
        } else {
            client
                .engine()
                .attach_database(uri, &dpb)
                .context("Attachment::attach", uri)?
        };
        debug!(uri, create = options.create_database, "attached");
        Ok(Self {
            client: client.clone(),
            uri: uri.to_string(),
            zone_rules: client.zone_rules(),
            handle: Some(handle),
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Whether the attachment still holds an engine handle.
    pub fn is_valid(&self) -> bool {
        self.handle.is_some()
    }

    pub(crate) fn handle(&self) -> Result<&dyn AttachmentHandle> {
        self.handle
            .as_deref()
            .ok_or_else(|| Error::usage("Attachment is not valid"))
    }

    pub(crate) fn zone_rules(&self) -> &dyn TimeZoneRules {
        self.zone_rules.as_ref()
    }

    /// Detach from the database.
    pub fn disconnect(&mut self) -> Result<()> {
        self.handle()?;
        if let Some(handle) = self.handle.take() {
            handle.detach().context("Attachment::disconnect", &self.uri)?;
            debug!(uri = %self.uri, "detached");
        }
        Ok(())
    }

    /// Drop the database and release the attachment.
    pub fn drop_database(&mut self) -> Result<()> {
        self.handle()?;
        if let Some(handle) = self.handle.take() {
            handle
                .drop_database()
                .context("Attachment::dropDatabase", &self.uri)?;
            debug!(uri = %self.uri, "database dropped");
        }
        Ok(())
    }
}

impl fmt::Debug for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attachment")
            .field("uri", &self.uri)
            .field("valid", &self.is_valid())
            .finish()
    }
}

impl Drop for Attachment {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.detach() {
                warn!(uri = %self.uri, error = %e, "failed to detach attachment on drop");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dpb_rendering() {
        let options = AttachmentOptions::new()
            .with_connection_charset("UTF8")
            .with_user_name("SYSDBA")
            .with_role("R");
        assert_eq!(
            options.to_dpb().unwrap(),
            vec![1, 48, 4, b'U', b'T', b'F', b'8', 28, 6, b'S', b'Y', b'S', b'D', b'B', b'A', 60, 1, b'R']
        );
        assert_eq!(AttachmentOptions::new().to_dpb().unwrap(), vec![1]);
    }

    #[test]
    fn test_raw_dpb_is_kept() {
        let options = AttachmentOptions::new()
            .with_dpb(vec![1, 29, 1, b'x'])
            .with_user_name("U");
        assert_eq!(options.to_dpb().unwrap(), vec![1, 29, 1, b'x', 28, 1, b'U']);
    }

    #[test]
    fn test_connect_missing_database_has_context() {
        let client = Client::memory();
        let err = Attachment::connect(&client, "mem:nowhere", &AttachmentOptions::new()).unwrap_err();
        assert!(matches!(
            err,
            Error::Context {
                operation: "Attachment::attach",
                ..
            }
        ));
        assert_eq!(err.codes(), vec![ISC_IO_ERROR]);
        assert!(err.to_string().contains("mem:nowhere"));
    }

    #[test]
    fn test_disconnect_invalidates() {
        let client = Client::memory();
        let options = AttachmentOptions::new().with_create_database(true);
        let mut attachment = Attachment::connect(&client, "mem:a", &options).unwrap();
        assert!(attachment.is_valid());
        attachment.disconnect().unwrap();
        assert!(!attachment.is_valid());
        assert!(matches!(attachment.disconnect(), Err(Error::Usage { .. })));
    }

    #[test]
    fn test_drop_database() {
        let client = Client::memory();
        let create = AttachmentOptions::new().with_create_database(true);
        let mut attachment = Attachment::connect(&client, "mem:b", &create).unwrap();
        attachment.drop_database().unwrap();
        assert!(Attachment::connect(&client, "mem:b", &AttachmentOptions::new()).is_err());
    }
}
