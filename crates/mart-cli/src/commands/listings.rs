//! Listing publication, lookup and matching.

use std::io::Write;

use mart_core::{AccountKey, Wallet};
use mart_market::{ListingDraft, ListingId, MatchQuery};

use crate::cli::{MatchArgs, PublishArgs};
use crate::error::CliError;
use crate::output::{ListingList, OutputFormat};
use crate::session::Session;

/// Listing command executor.
#[derive(Debug)]
pub struct ListingCommand<'a> {
    session: &'a Session,
}

impl<'a> ListingCommand<'a> {
    /// Create a listing command over `session`.
    #[must_use]
    pub const fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// Sign and publish a listing.
    ///
    /// # Errors
    ///
    /// Returns an error if the secret is malformed or publication is
    /// rejected.
    pub fn publish<W: Write>(&self, writer: &mut W, format: &OutputFormat, args: &PublishArgs) -> Result<(), CliError> {
        let wallet = Wallet::from_base58_secret(&args.secret)?;
        let draft = ListingDraft {
            title: args.title.clone(),
            content: args.content.clone(),
            city: args.city.clone(),
            price: args.price,
        };
        let signature = wallet.sign(&draft.signing_bytes()?).to_bytes();

        let listing = self.session.market().publish(&wallet.account(), draft, &signature)?;
        self.session.save()?;
        format.write(writer, &listing)
    }

    /// Show one listing.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing does not exist.
    pub fn show<W: Write>(&self, writer: &mut W, format: &OutputFormat, id: &ListingId) -> Result<(), CliError> {
        let listing = self.session.market().listing(id)?;
        format.write(writer, &listing)
    }

    /// List every listing, or one owner's.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn list<W: Write>(&self, writer: &mut W, format: &OutputFormat, owner: Option<&AccountKey>) -> Result<(), CliError> {
        let market = self.session.market();
        let listings = match owner {
            Some(owner) => market.listings_by_owner(owner)?,
            None => market.all_listings()?,
        };
        format.write(writer, &ListingList { listings })
    }

    /// Rank listings against a city and price range.
    ///
    /// # Errors
    ///
    /// Returns an error for inverted bounds or an unknown matcher.
    pub fn matching<W: Write>(&self, writer: &mut W, format: &OutputFormat, args: &MatchArgs) -> Result<(), CliError> {
        let query = MatchQuery::new(args.city.clone(), args.lower, args.upper);
        let result = self.session.market().matching(args.matcher.as_deref(), &query)?;
        format.write(writer, &result)
    }
}
