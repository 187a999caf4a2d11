use crate::cli::command_handlers::{
    AuditLogHandler, ConfigHandler, CostCenterHandler, EmployeeHandler, ProfileHandler,
    PromotionHandler, RoleHandler,
};
use crate::cli::main_types::Commands;
use hr_core::api::client::BackendClient;
use hr_core::core::auth::{AuthContext, restore_session};
use hr_core::core::notify::{Notification, Notifier, Variant};
use hr_core::core::services::config_service::ConfigService;
use hr_core::display::ConsoleNotifier;
use hr_core::error::{AppError, AuthError};
use hr_core::storage::credentials::resolve_access_token;
use hr_core::utils::logging::print_verbose;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Console output that remembers how many failures were already shown.
#[derive(Default)]
pub struct ReportingNotifier {
    console: ConsoleNotifier,
    failures: AtomicUsize,
}

impl ReportingNotifier {
    pub fn failures(&self) -> usize {
        self.failures.load(Ordering::SeqCst)
    }
}

impl Notifier for ReportingNotifier {
    fn notify(&self, notification: Notification) {
        if notification.variant == Variant::Destructive {
            self.failures.fetch_add(1, Ordering::SeqCst);
        }
        self.console.notify(notification);
    }
}

/// Everything a handler needs to talk to the backend as the signed-in user.
pub struct AppContext {
    pub client: Arc<BackendClient>,
    pub auth: AuthContext,
    pub notifier: Arc<dyn Notifier>,
    pub verbose: bool,
}

pub struct Dispatcher {
    config_service: ConfigService,
    verbose: bool,
    token: Option<String>,
    notifier: Arc<ReportingNotifier>,
}

impl Dispatcher {
    fn log_verbose(&self, msg: &str) {
        print_verbose(self.verbose, msg);
    }

    pub fn new(config_service: ConfigService, verbose: bool, token: Option<String>) -> Self {
        Self {
            config_service,
            verbose,
            token,
            notifier: Arc::new(ReportingNotifier::default()),
        }
    }

    /// True when the failure was already shown as a notification.
    pub fn already_reported(&self) -> bool {
        self.notifier.failures() > 0
    }

    fn create_client(&self) -> Result<BackendClient, AppError> {
        let connection = self.config_service.connection()?;
        match resolve_access_token(self.token.as_deref()) {
            Some(token) => {
                self.log_verbose("Creating client with access token");
                Ok(BackendClient::with_access_token(
                    connection.url,
                    connection.anon_key,
                    token,
                )?)
            }
            None => {
                self.log_verbose("Creating client with anon key only");
                Ok(BackendClient::new(connection.url, connection.anon_key)?)
            }
        }
    }

    /// Client plus a session resolved from the access token.
    async fn signed_in_context(&self) -> Result<AppContext, AppError> {
        let client = self.create_client()?;
        if !client.is_authenticated() {
            return Err(AuthError::NotSignedIn.into());
        }

        let session = restore_session(&client).await?;
        self.log_verbose(&format!(
            "Signed in as {} with roles [{}]",
            session.email.as_deref().unwrap_or("unknown user"),
            session
                .roles
                .iter()
                .map(|r| r.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ));

        Ok(AppContext {
            client: Arc::new(client),
            auth: AuthContext::signed_in(session),
            notifier: self.notifier.clone(),
            verbose: self.verbose,
        })
    }

    pub async fn dispatch(&mut self, command: Commands) -> Result<(), AppError> {
        match command {
            Commands::Config { command } => {
                let has_token = resolve_access_token(self.token.as_deref()).is_some();
                ConfigHandler::new().handle(command, &mut self.config_service, has_token, self.verbose)
            }
            Commands::CostCenter { command } => {
                let context = self.signed_in_context().await?;
                CostCenterHandler::new().handle(command, context).await
            }
            Commands::AuditLog { command } => {
                let context = self.signed_in_context().await?;
                AuditLogHandler::new().handle(command, context).await
            }
            Commands::Me(output) => {
                let context = self.signed_in_context().await?;
                ProfileHandler::new().handle(output, context).await
            }
            Commands::Role { command } => {
                let handler = RoleHandler::new();
                if handler.needs_backend(&command) {
                    let context = self.signed_in_context().await?;
                    handler.handle(command, Some(context), self.notifier.clone()).await
                } else {
                    handler.handle(command, None, self.notifier.clone()).await
                }
            }
            Commands::Employee { command } => {
                let handler = EmployeeHandler::new();
                if handler.needs_backend(&command) {
                    let context = self.signed_in_context().await?;
                    handler.handle(command, Some(context)).await
                } else {
                    handler.handle(command, None).await
                }
            }
            Commands::Promotion { command } => PromotionHandler::new().handle(command).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reporting_notifier_counts_destructive_only() {
        let notifier = ReportingNotifier::default();
        notifier.notify(Notification::success("Saved"));
        assert_eq!(notifier.failures(), 0);

        notifier.notify(Notification::error("Permission Denied", "no access"));
        assert_eq!(notifier.failures(), 1);
    }
}
