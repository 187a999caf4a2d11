use crate::cli::dispatcher::AppContext;
use crate::cli::main_types::{
    AuditLogCommands, ConfigCommands, CostCenterCommands, EmployeeArgs, EmployeeCommands,
    OutputArgs, OutputFormat, PromotionCommands, RoleCommands,
};
use hr_core::api::models::{
    AppPermission, AppRole, CostCenterPatch, EmployeeUpdateData, NewCostCenter,
};
use hr_core::api::realtime::{ChangeFeed, RealtimeClient};
use hr_core::core::notify::Notifier;
use hr_core::core::progress::{PromotionProgress, PromotionStep};
use hr_core::core::services::audit_log_service::AuditLogStore;
use hr_core::core::services::config_service::ConfigService;
use hr_core::core::services::cost_center_service::{CostCenterStore, WatchExit};
use hr_core::core::services::employee_self_service::EmployeeSelfStore;
use hr_core::core::services::employee_update_service::EmployeeUpdateService;
use hr_core::core::services::role_service::{RolePermissionStore, RoleRequestOutcome, RoleService};
use hr_core::display::{ProgressSpinner, TableDisplay, render_promotion_progress, show_progress_bar};
use hr_core::error::{AppError, CliError, ServiceError, UtilsError};
use hr_core::storage::config::Config;
use hr_core::utils::file::read_employee_file;
use hr_core::utils::logging::print_verbose;
use hr_core::utils::text::{mask_secret, pad_to_width};
use hr_core::utils::validation::{
    field_label, find_duplicate_employee_ids, validate_bulk_employee_data, validate_employee_data,
};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let text = serde_json::to_string_pretty(value).map_err(|e| UtilsError::InputProcessing {
        message: format!("Failed to serialize output: {}", e),
    })?;
    println!("{}", text);
    Ok(())
}

#[derive(Default)]
pub struct ConfigHandler;

impl ConfigHandler {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(
        &self,
        command: ConfigCommands,
        config_service: &mut ConfigService,
        has_token: bool,
        verbose: bool,
    ) -> Result<(), AppError> {
        match command {
            ConfigCommands::Show => {
                print_verbose(verbose, "Showing configuration");

                println!("Current Configuration:");
                println!("=====================");
                let label = |s: &str| pad_to_width(s, 14);
                println!(
                    "{}{}",
                    label("URL:"),
                    config_service
                        .get_url()
                        .unwrap_or_else(|| "❌ Not set".to_string())
                );
                println!(
                    "{}{}",
                    label("Anon key:"),
                    config_service
                        .get_anon_key()
                        .map(|k| mask_secret(&k))
                        .unwrap_or_else(|| "❌ Not set".to_string())
                );
                println!(
                    "{}{}",
                    label("Access token:"),
                    if has_token {
                        "✅ Set (HR_ACCESS_TOKEN or --token)"
                    } else {
                        "❌ Not set"
                    }
                );
                if let Ok(path) = Config::config_file_path() {
                    print_verbose(verbose, &format!("Default config file: {}", path.display()));
                }
                Ok(())
            }
            ConfigCommands::Set { url, anon_key } => {
                let mut updated_fields = Vec::new();

                if let Some(url_value) = url {
                    config_service.set_url(&url_value)?;
                    updated_fields.push("URL");
                }
                if let Some(key_value) = anon_key {
                    config_service.set_anon_key(&key_value)?;
                    updated_fields.push("anon key");
                }

                if updated_fields.is_empty() {
                    return Err(AppError::Cli(CliError::InvalidArguments(
                        "No configuration values provided. Use --url and/or --anon-key".to_string(),
                    )));
                }

                config_service.save()?;
                println!("✅ Saved {}", updated_fields.join(" and "));
                Ok(())
            }
        }
    }
}

#[derive(Default)]
pub struct CostCenterHandler;

impl CostCenterHandler {
    pub fn new() -> Self {
        Self
    }

    pub async fn handle(&self, command: CostCenterCommands, ctx: AppContext) -> Result<(), AppError> {
        let store = CostCenterStore::new(ctx.client.clone(), ctx.auth.clone(), ctx.notifier.clone());

        match command {
            CostCenterCommands::List(output) => {
                let mut spinner = ProgressSpinner::new("Fetching cost centers...");
                spinner.start();
                let result = store.fetch().await;
                spinner.stop(None);
                let cost_centers = result?;

                match output.format {
                    OutputFormat::Json => print_json(&cost_centers),
                    OutputFormat::Table => {
                        println!("{}", TableDisplay::new().render_cost_centers(&cost_centers));
                        Ok(())
                    }
                }
            }
            CostCenterCommands::Create {
                code,
                name,
                description,
            } => {
                store
                    .create(NewCostCenter {
                        code,
                        name,
                        description,
                        ..Default::default()
                    })
                    .await?;
                Ok(())
            }
            CostCenterCommands::Update {
                id,
                code,
                name,
                description,
            } => {
                store
                    .update(
                        id,
                        CostCenterPatch {
                            code,
                            name,
                            description,
                            is_active: None,
                        },
                    )
                    .await?;
                Ok(())
            }
            CostCenterCommands::Delete { id } => store.deactivate(id).await,
            CostCenterCommands::Watch => self.watch(&store, &ctx).await,
        }
    }

    async fn watch(&self, store: &CostCenterStore, ctx: &AppContext) -> Result<(), AppError> {
        let feed: Arc<dyn ChangeFeed> = Arc::new(RealtimeClient::from_client(&ctx.client)?);
        let shutdown = CancellationToken::new();
        let _stop_on_exit = shutdown.clone().drop_guard();

        {
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    shutdown.cancel();
                }
            });
        }

        println!("Watching cost centers. Press Ctrl-C to stop.");
        let display = TableDisplay::new();
        let mut changes = store.subscribe_changes();
        let watcher = store.watch(feed, shutdown.clone());
        tokio::pin!(watcher);

        loop {
            tokio::select! {
                exit = &mut watcher => {
                    match exit? {
                        WatchExit::Shutdown => println!("Stopped."),
                        WatchExit::SignedOut => println!("Session ended."),
                        WatchExit::FeedClosed => println!("Change feed closed by the server."),
                    }
                    return Ok(());
                }
                changed = changes.changed() => {
                    if changed.is_err() {
                        return Ok(());
                    }
                    let revision = *changes.borrow_and_update();
                    let snapshot = store.snapshot().await;
                    print_verbose(ctx.verbose, &format!("Listing revision {}", revision));
                    println!("\n{}", display.render_cost_centers(&snapshot.data));
                }
            }
        }
    }
}

#[derive(Default)]
pub struct AuditLogHandler;

impl AuditLogHandler {
    pub fn new() -> Self {
        Self
    }

    pub async fn handle(&self, command: AuditLogCommands, ctx: AppContext) -> Result<(), AppError> {
        match command {
            AuditLogCommands::List { limit, output } => {
                let store = AuditLogStore::new(ctx.client.clone(), ctx.client.clone(), ctx.auth.clone());
                let entries = store.fetch().await?;

                if let Some(error) = store.snapshot().await.error {
                    eprintln!("⚠️  Audit log unavailable: {}", error);
                }

                match output.format {
                    OutputFormat::Json => {
                        let shown = &entries[..entries.len().min(limit)];
                        print_json(&shown)
                    }
                    OutputFormat::Table => {
                        println!("{}", TableDisplay::new().render_audit_logs(&entries, Some(limit)));
                        Ok(())
                    }
                }
            }
        }
    }
}

#[derive(Default)]
pub struct ProfileHandler;

impl ProfileHandler {
    pub fn new() -> Self {
        Self
    }

    pub async fn handle(&self, output: OutputArgs, ctx: AppContext) -> Result<(), AppError> {
        let store = EmployeeSelfStore::new(ctx.client.clone(), ctx.auth.clone(), ctx.notifier.clone());
        let Some(employee) = store.fetch().await? else {
            println!("No employee record is linked to your account.");
            return Ok(());
        };

        match output.format {
            OutputFormat::Json => print_json(&employee),
            OutputFormat::Table => {
                println!("{}", TableDisplay::new().render_employee_profile(&employee));
                Ok(())
            }
        }
    }
}

#[derive(Default)]
pub struct RoleHandler;

impl RoleHandler {
    pub fn new() -> Self {
        Self
    }

    pub fn needs_backend(&self, command: &RoleCommands) -> bool {
        !matches!(command, RoleCommands::Create { .. })
    }

    pub async fn handle(
        &self,
        command: RoleCommands,
        ctx: Option<AppContext>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<(), AppError> {
        match (command, ctx) {
            (RoleCommands::Create { name, description }, _) => {
                match RoleService::new(notifier).request_role(&name, description.as_deref()) {
                    RoleRequestOutcome::MigrationRequired => Ok(()),
                    RoleRequestOutcome::Rejected => Err(AppError::Cli(CliError::InvalidArguments(
                        format!("Role request '{}' was rejected", name.trim()),
                    ))),
                }
            }
            (RoleCommands::Permissions(output), Some(ctx)) => {
                let store = RolePermissionStore::new(ctx.client.clone(), ctx.notifier.clone());
                let grants = store.fetch().await?;
                match output.format {
                    OutputFormat::Json => print_json(&grants),
                    OutputFormat::Table => {
                        println!("{}", TableDisplay::new().render_permission_matrix(&grants));
                        Ok(())
                    }
                }
            }
            (RoleCommands::Toggle { role, permission }, Some(ctx)) => {
                let role: AppRole = role
                    .parse()
                    .map_err(|e: String| AppError::Cli(CliError::InvalidArguments(e)))?;
                let permission = AppPermission::new(permission)
                    .map_err(|e| AppError::Cli(CliError::InvalidArguments(e)))?;

                let store = RolePermissionStore::new(ctx.client.clone(), ctx.notifier.clone());
                store.fetch().await?;
                if store.toggle_permission(role, permission).await {
                    Ok(())
                } else {
                    Err(AppError::Cli(CliError::InvalidArguments(
                        "Permission was not changed".to_string(),
                    )))
                }
            }
            (_, None) => Err(AppError::Cli(CliError::InvalidArguments(
                "This command needs a backend connection".to_string(),
            ))),
        }
    }
}

#[derive(Default)]
pub struct EmployeeHandler;

impl EmployeeHandler {
    pub fn new() -> Self {
        Self
    }

    pub fn needs_backend(&self, command: &EmployeeCommands) -> bool {
        match command {
            EmployeeCommands::Validate { .. } => false,
            EmployeeCommands::Upload { dry_run, .. } => !dry_run,
            _ => true,
        }
    }

    pub async fn handle(&self, command: EmployeeCommands, ctx: Option<AppContext>) -> Result<(), AppError> {
        match command {
            EmployeeCommands::Validate { file } => {
                self.check_file(&file)?;
                println!("✅ Upload file is valid");
                Ok(())
            }
            EmployeeCommands::Upload { file, dry_run } => {
                let rows = self.check_file(&file)?;
                if dry_run {
                    println!("✅ {} rows would be uploaded", rows.len());
                    return Ok(());
                }
                let ctx = require_context(ctx)?;
                self.upload(&rows, &ctx).await
            }
            EmployeeCommands::Upsert(args) => {
                let ctx = require_context(ctx)?;
                let edit = args.edit;
                let data = employee_from_args(args);

                let problems = validate_employee_data(&data, edit);
                if !problems.is_empty() {
                    for problem in &problems {
                        eprintln!("  {}: {}", field_label(problem.field), problem.message);
                    }
                    return Err(UtilsError::Validation {
                        message: format!("{} field(s) need attention", problems.len()),
                    }
                    .into());
                }

                let service = EmployeeUpdateService::new(ctx.client.clone(), ctx.notifier.clone());
                service.upsert_employee(&data).await?;
                Ok(())
            }
            EmployeeCommands::Delete { employee_id } => {
                let ctx = require_context(ctx)?;
                EmployeeUpdateService::new(ctx.client.clone(), ctx.notifier.clone())
                    .deactivate(&employee_id)
                    .await
            }
        }
    }

    /// Load an upload file and report every problem found in it.
    fn check_file(&self, file: &Path) -> Result<Vec<EmployeeUpdateData>, AppError> {
        let rows = read_employee_file(file)?;
        let problems = validate_bulk_employee_data(&rows);
        let duplicates = find_duplicate_employee_ids(&rows);

        if !problems.is_empty() {
            eprintln!("{}", TableDisplay::new().render_row_errors(&problems));
        }
        if !duplicates.is_empty() {
            eprintln!("Duplicate employee IDs: {}", duplicates.join(", "));
        }
        if !problems.is_empty() || !duplicates.is_empty() {
            return Err(UtilsError::Validation {
                message: format!(
                    "{} row(s) with missing fields, {} duplicate employee ID(s)",
                    problems.len(),
                    duplicates.len()
                ),
            }
            .into());
        }
        Ok(rows)
    }

    async fn upload(&self, rows: &[EmployeeUpdateData], ctx: &AppContext) -> Result<(), AppError> {
        let service = EmployeeUpdateService::new(ctx.client.clone(), ctx.notifier.clone());
        let verbose = ctx.verbose;

        let result = service
            .upload_employees(rows, |progress| {
                print_verbose(verbose, &format!("Uploading {}", progress.current_employee));
                show_progress_bar(progress.current, progress.total, 30);
            })
            .await;

        if result.success {
            return Ok(());
        }
        eprintln!("{}", TableDisplay::new().render_upload_errors(&result.errors));
        Err(ServiceError::Upload {
            message: format!("{} of {} rows failed", result.errors.len(), rows.len()),
        }
        .into())
    }
}

fn require_context(ctx: Option<AppContext>) -> Result<AppContext, AppError> {
    ctx.ok_or_else(|| {
        AppError::Cli(CliError::InvalidArguments(
            "This command needs a backend connection".to_string(),
        ))
    })
}

fn employee_from_args(args: EmployeeArgs) -> EmployeeUpdateData {
    EmployeeUpdateData {
        employee_id: args.employee_id,
        english_name: args.english_name,
        arabic_name: args.arabic_name,
        status: args.status,
        position: args.position,
        category: args.category,
        personal_email: args.personal_email,
        work_phone: args.work_phone,
        nationality: args.nationality,
        date_of_joining: args.date_of_joining,
        birth_date: args.birth_date,
        ..Default::default()
    }
}

const DEMO_STEPS: [(&str, &str, u64); 5] = [
    ("backup", "Back up target environment", 1),
    ("schema", "Apply schema changes", 14),
    ("cost_centers", "Copy cost centers", 42),
    ("employees", "Copy employee records", 318),
    ("verify", "Verify row counts", 0),
];

#[derive(Default)]
pub struct PromotionHandler;

impl PromotionHandler {
    pub fn new() -> Self {
        Self
    }

    pub async fn handle(&self, command: PromotionCommands) -> Result<(), AppError> {
        match command {
            PromotionCommands::Demo { fail_step } => {
                let progress = self.run_demo(fail_step.as_deref(), Duration::from_millis(400), true).await?;
                if progress.has_errors() {
                    return Err(ServiceError::Upload {
                        message: "promotion stopped after a failed step".to_string(),
                    }
                    .into());
                }
                Ok(())
            }
        }
    }

    async fn run_demo(
        &self,
        fail_step: Option<&str>,
        step_delay: Duration,
        render: bool,
    ) -> Result<PromotionProgress, AppError> {
        let mut progress = PromotionProgress::new(
            DEMO_STEPS
                .iter()
                .map(|(id, name, _)| PromotionStep::new(*id, *name))
                .collect(),
        );
        let transition = |e: hr_core::core::progress::TransitionError| {
            AppError::Cli(CliError::InvalidArguments(e.to_string()))
        };

        for (id, _, count) in DEMO_STEPS {
            progress.start(id).map_err(transition)?;
            if render {
                println!("{}\n", render_promotion_progress(&progress));
            }
            tokio::time::sleep(step_delay).await;

            if fail_step == Some(id) {
                progress
                    .fail(id, "simulated failure")
                    .map_err(transition)?;
                break;
            }
            let count = (count > 0).then_some(count);
            progress.complete(id, count).map_err(transition)?;
        }

        progress.finish();
        if render {
            println!("{}", render_promotion_progress(&progress));
        }
        Ok(progress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_promotion_demo_completes_all_steps() {
        let progress = PromotionHandler::new()
            .run_demo(None, Duration::ZERO, false)
            .await
            .unwrap();
        assert!(progress.is_complete);
        assert!(!progress.has_errors());
        assert_eq!(progress.completed_count(), DEMO_STEPS.len());
        assert_eq!(progress.total_records(), 375);
    }

    #[tokio::test]
    async fn test_promotion_demo_stops_at_failed_step() {
        let progress = PromotionHandler::new()
            .run_demo(Some("cost_centers"), Duration::ZERO, false)
            .await
            .unwrap();
        assert!(progress.has_errors());
        assert_eq!(progress.completed_count(), 2);
        assert_eq!(progress.progress(), 100.0);
    }

    #[test]
    fn test_employee_needs_backend() {
        let handler = EmployeeHandler::new();
        assert!(!handler.needs_backend(&EmployeeCommands::Validate {
            file: "rows.json".into()
        }));
        assert!(!handler.needs_backend(&EmployeeCommands::Upload {
            file: "rows.json".into(),
            dry_run: true
        }));
        assert!(handler.needs_backend(&EmployeeCommands::Delete {
            employee_id: "E1".to_string()
        }));
    }

    #[test]
    fn test_check_file_reports_problems() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("rows.json");
        std::fs::write(
            &path,
            r#"[{"employee_id": "E1", "english_name": "A"}, {"employee_id": "E1"}]"#,
        )
        .expect("write failed");

        let err = EmployeeHandler::new().check_file(&path).unwrap_err();
        assert!(matches!(err, AppError::Utils(UtilsError::Validation { .. })));
    }
}
