// self
use crate::_prelude::*;

/// One page of an OData collection.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Page<T> {
	/// Items on this page.
	#[serde(default = "Vec::new")]
	pub value: Vec<T>,
	/// Absolute URL of the next page; absent or empty on the last page.
	#[serde(rename = "@odata.nextLink", default, skip_serializing_if = "Option::is_none")]
	pub next_link: Option<String>,
}
impl<T> Page<T> {
	/// Splits the page into its items and the cursor to follow, if any.
	pub fn into_parts(self) -> (Vec<T>, Option<String>) {
		(self.value, self.next_link.filter(|link| !link.is_empty()))
	}
}
