//! User registration.

use std::io::Write;

use mart_core::Wallet;
use mart_market::UserProfile;

use crate::cli::RegisterArgs;
use crate::error::CliError;
use crate::output::{OutputFormat, Registered};
use crate::session::Session;

/// User command executor.
#[derive(Debug)]
pub struct UserCommand<'a> {
    session: &'a Session,
}

impl<'a> UserCommand<'a> {
    /// Create a user command over `session`.
    #[must_use]
    pub const fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// Sign the profile with the given secret and register it.
    ///
    /// # Errors
    ///
    /// Returns an error if the secret is malformed or the registration is
    /// rejected.
    pub fn register<W: Write>(&self, writer: &mut W, format: &OutputFormat, args: &RegisterArgs) -> Result<(), CliError> {
        let wallet = Wallet::from_base58_secret(&args.secret)?;
        let profile = UserProfile {
            nickname: args.nickname.clone(),
            name: args.name.clone(),
            age: args.age.clone(),
            phone: args.phone.clone(),
            id_number: args.id_number.clone(),
            company_id: args.company_id.clone(),
            company_name: args.company_name.clone(),
        };
        let signature = wallet.sign(&profile.signing_bytes()?).to_bytes();

        let onboarding = self.session.market().register(&wallet.account(), profile, &signature)?;
        self.session.save()?;
        format.write(writer, &Registered::from(onboarding))
    }
}
