//! Launching the user's browser at the authorization URL.

// std
use std::io;
// self
use crate::_prelude::*;

/// Opens a URL for the user. Failures are reported, never swallowed.
pub trait BrowserLauncher
where
	Self: Send + Sync,
{
	/// Points the user's browser at `url`.
	fn open(&self, url: &Url) -> io::Result<()>;
}
impl<F> BrowserLauncher for F
where
	F: Fn(&Url) -> io::Result<()> + Send + Sync,
{
	fn open(&self, url: &Url) -> io::Result<()> {
		self(url)
	}
}

/// Uses the platform's default browser.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemBrowser;
impl BrowserLauncher for SystemBrowser {
	fn open(&self, url: &Url) -> io::Result<()> {
		open::that(url.as_str())
	}
}
