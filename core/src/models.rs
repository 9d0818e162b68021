//! OZmap resource names and their `/api/v2` path segments.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// A resource type exposed by the OZmap API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Model {
    Box,
    Splitter,
    Project,
    Client,
    Property,
    Olt,
    Building,
    Region,
    NetworkConnector,
    NetworkConnectable,
    Fiber,
    Drop,
    HorizontalCondominium,
}

impl Model {
    pub const ALL: [Model; 13] = [
        Model::Box,
        Model::Splitter,
        Model::Project,
        Model::Client,
        Model::Property,
        Model::Olt,
        Model::Building,
        Model::Region,
        Model::NetworkConnector,
        Model::NetworkConnectable,
        Model::Fiber,
        Model::Drop,
        Model::HorizontalCondominium,
    ];

    /// Short model name, e.g. `network_connector`.
    pub fn name(&self) -> &'static str {
        match self {
            Model::Box => "box",
            Model::Splitter => "splitter",
            Model::Project => "project",
            Model::Client => "client",
            Model::Property => "property",
            Model::Olt => "olt",
            Model::Building => "building",
            Model::Region => "region",
            Model::NetworkConnector => "network_connector",
            Model::NetworkConnectable => "network_connectable",
            Model::Fiber => "fiber",
            Model::Drop => "drop",
            Model::HorizontalCondominium => "horizontal_condominium",
        }
    }

    /// Path segment under `/api/v2`, e.g. `network-connectors`.
    pub fn path(&self) -> &'static str {
        match self {
            Model::Box => "boxes",
            Model::Splitter => "splitters",
            Model::Project => "projects",
            Model::Client => "ftth-clients",
            Model::Property => "properties",
            Model::Olt => "olts",
            Model::Building => "buildings",
            Model::Region => "regions",
            Model::NetworkConnector => "network-connectors",
            Model::NetworkConnectable => "network-connectables",
            Model::Fiber => "fibers",
            Model::Drop => "drops",
            Model::HorizontalCondominium => "horizontal-condominiums",
        }
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

impl AsRef<str> for Model {
    fn as_ref(&self) -> &str {
        self.path()
    }
}

impl FromStr for Model {
    type Err = Error;

    /// Accepts either the short name or the path segment.
    fn from_str(s: &str) -> Result<Self> {
        Model::ALL
            .into_iter()
            .find(|model| model.name() == s || model.path() == s)
            .ok_or_else(|| Error::Configuration(format!("unknown OZmap model: {s}")))
    }
}
