//! Uniform tag access across EC2 resource types
//!
//! Every VPC-scoped EC2 type carries the same `Vec<Tag>` shape but the SDK
//! generates a distinct type per resource. `HasTags` gives them one accessor
//! so display-name lookup works the same everywhere.

use aws_sdk_ec2::types::{InternetGateway, NetworkAcl, RouteTable, SecurityGroup, Subnet, Tag, Vpc};

/// The tag key AWS consoles use for a resource's display name.
const NAME_KEY: &str = "Name";

/// Access to the tag list of an EC2 resource.
pub trait HasTags {
    fn resource_tags(&self) -> &[Tag];

    /// The value of the `Name` tag, or an empty string when the resource is
    /// untagged or has no `Name` key.
    fn name_tag(&self) -> String {
        tag_value(self.resource_tags(), NAME_KEY).unwrap_or_default()
    }
}

/// Look up a single tag value by key.
fn tag_value(tags: &[Tag], key: &str) -> Option<String> {
    tags.iter()
        .find(|tag| tag.key() == Some(key))
        .and_then(|tag| tag.value())
        .map(str::to_string)
}

macro_rules! has_tags {
    ($($ty:ty),+ $(,)?) => {
        $(impl HasTags for $ty {
            fn resource_tags(&self) -> &[Tag] {
                self.tags()
            }
        })+
    };
}

has_tags!(Vpc, InternetGateway, Subnet, RouteTable, NetworkAcl, SecurityGroup);
