//! plan / apply / show / destroy

use anyhow::{Result, bail};
use colored::Colorize;
use declarative::ChangeSet;
use dctkit::backend::http::HttpBackend;
use dctkit::{ExistencePoller, JobPoller};
use dialoguer::Confirm;
use std::path::Path;

use crate::Context;
use crate::engine::planner::UpdatePlan;
use crate::progress::JobSpinner;
use crate::resource::capabilities::environment_capabilities;
use crate::resource::{EnvironmentResource, ReadResult, ResourceError};
use crate::schema::{EnvironmentFile, EnvironmentSpec};
use crate::state::{EnvironmentRecord, HostenvState};
use crate::ui;

// ============================================================================
// Plan
// ============================================================================

/// Show what `apply` would do, without any remote call.
pub fn plan(ctx: &Context, file: &Path) -> Result<()> {
    let desired = EnvironmentFile::load(file)?;
    let state = HostenvState::load(&ctx.config.state_dir())?;

    let Some(previous) = state.find_for(&desired) else {
        print_creation(&desired);
        return Ok(());
    };

    let changes = EnvironmentResource::changes(previous, &desired)?;
    if changes.is_empty() {
        ui::success(&format!("Environment '{}' is up to date", desired.name));
        return Ok(());
    }

    let plan = checked_plan(&changes)?;
    print_changes(&desired.name, &changes, &plan);
    Ok(())
}

// ============================================================================
// Apply
// ============================================================================

/// Create the environment if it is not known yet, otherwise update it.
pub fn apply(ctx: &Context, file: &Path, yes: bool) -> Result<()> {
    let desired = EnvironmentFile::load(file)?;
    let state_dir = ctx.config.state_dir();
    let mut state = HostenvState::load(&state_dir)?;

    let existing = state.find_for(&desired).cloned();
    let Some(previous) = existing else {
        print_creation(&desired);
        if !yes && !confirm(&format!("Create environment '{}'?", desired.name))? {
            ui::info("Cancelled");
            return Ok(());
        }

        let record = with_resource(ctx, "Registering environment", |resource| {
            resource.create(&desired)
        })??;
        let id = record.id.clone();
        state.upsert(&desired.name, record);
        state.save(&state_dir)?;
        ui::success(&format!("Created environment '{}' ({id})", desired.name));
        return Ok(());
    };

    let changes = EnvironmentResource::changes(&previous, &desired)?;
    if changes.is_empty() {
        ui::success(&format!("Environment '{}' is up to date", desired.name));
        return Ok(());
    }

    let plan = checked_plan(&changes)?;
    print_changes(&previous.spec.name, &changes, &plan);
    if !yes && !confirm("Apply these changes?")? {
        ui::info("Cancelled");
        return Ok(());
    }

    let report = with_resource(ctx, "Updating environment", |resource| {
        resource.update(&previous, &desired)
    })?;

    match report.record {
        Some(record) => state.upsert(&previous.spec.name, record),
        None => {
            state.remove(&previous.spec.name);
        }
    }
    state.save(&state_dir)?;

    if let Some(err) = report.error {
        report_error(&err);
        bail!("Update of '{}' did not fully apply", previous.spec.name);
    }

    ui::success(&format!(
        "Updated environment '{}' ({} batch(es))",
        desired.name,
        report.outcome.succeeded.len()
    ));
    Ok(())
}

// ============================================================================
// Show
// ============================================================================

pub fn show(ctx: &Context, name: &str, refresh: bool) -> Result<()> {
    let state_dir = ctx.config.state_dir();
    let mut state = HostenvState::load(&state_dir)?;
    let existing = state.get(name).cloned();
    let Some(mut record) = existing else {
        bail!("No environment named '{name}' in {}", state_dir.display());
    };

    if refresh {
        let result = with_resource(ctx, "Reading environment", |resource| {
            resource.read(&record.id, &record.spec, record.observed.user_ref.clone())
        })??;
        match result {
            ReadResult::Found(fresh) => {
                state.upsert(name, fresh.clone());
                record = fresh;
            }
            ReadResult::Gone => {
                state.remove(name);
                state.save(&state_dir)?;
                ui::warn(&format!(
                    "Environment '{name}' ({}) no longer exists; removed from state",
                    record.id
                ));
                return Ok(());
            }
        }
        state.save(&state_dir)?;
    }

    print_record(&record, ctx.verbose > 0);
    Ok(())
}

// ============================================================================
// Destroy
// ============================================================================

pub fn destroy(ctx: &Context, name: &str, yes: bool) -> Result<()> {
    let state_dir = ctx.config.state_dir();
    let mut state = HostenvState::load(&state_dir)?;
    let existing = state.get(name).cloned();
    let Some(record) = existing else {
        bail!("No environment named '{name}' in {}", state_dir.display());
    };

    if !yes && !confirm(&format!("Delete environment '{name}' ({})?", record.id))? {
        ui::info("Cancelled");
        return Ok(());
    }

    with_resource(ctx, "Deleting environment", |resource| resource.delete(&record.id))??;
    state.remove(name);
    state.save(&state_dir)?;
    ui::success(&format!("Deleted environment '{name}'"));
    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

/// Run `f` against the live control plane, with a spinner while jobs run.
fn with_resource<T>(
    ctx: &Context,
    message: &str,
    f: impl FnOnce(&EnvironmentResource<'_>) -> T,
) -> Result<T> {
    let backend = HttpBackend::new(ctx.config.http()?);
    log::debug!("Using control plane at {}", backend.base_url());

    let spinner = JobSpinner::new(message, ctx.quiet);
    let jobs = JobPoller::new(&backend, ctx.config.job_polling()).with_observer(&spinner);
    let resource = EnvironmentResource::new(
        &backend,
        &jobs,
        ExistencePoller::new(ctx.config.existence_polling()),
    );

    let result = f(&resource);
    spinner.finish();
    Ok(result)
}

fn confirm(prompt: &str) -> Result<bool> {
    let confirmed = Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()?;
    Ok(confirmed)
}

/// Plan the change set, printing every rejected field before failing.
fn checked_plan(changes: &ChangeSet) -> Result<UpdatePlan> {
    match UpdatePlan::build(changes, &environment_capabilities()) {
        Ok(plan) => Ok(plan),
        Err(e) => {
            for field in &e.fields {
                ui::error(&format!("{field} cannot be changed after creation"));
            }
            bail!("{e}");
        }
    }
}

fn print_creation(desired: &EnvironmentSpec) {
    ui::header(&format!("Environment '{}' will be created", desired.name));
    ui::kv("engine", &desired.engine_id);
    ui::kv("os type", &desired.os_type);
    if let Some(host) = desired.primary_host() {
        ui::kv("host", &host.hostname);
    }
    if !desired.tags.is_empty() {
        ui::kv("tags", &tag_list(desired));
    }
}

fn print_changes(name: &str, changes: &ChangeSet, plan: &UpdatePlan) {
    let summary = changes.summary();
    ui::header(&format!(
        "Environment '{name}': {} change(s)",
        summary.total()
    ));
    for (field, change) in changes.iter() {
        let destructive = plan.destructive_fields.iter().any(|f| f == field);
        ui::change(field, change, destructive);
    }

    ui::section("Batches");
    for batch in &plan.batches {
        println!("  {} {batch}", "•".cyan());
    }
    if plan.destructive {
        ui::warn("Dependent VDBs and dSources will be disabled during the update");
    }
}

fn print_record(record: &EnvironmentRecord, detailed: bool) {
    let spec = &record.spec;
    ui::header(&format!("Environment '{}'", spec.name));
    ui::kv("id", &record.id);
    ui::kv("engine", &spec.engine_id);
    ui::kv("os type", &spec.os_type);
    ui::kv(
        "enabled",
        &if record.observed.enabled {
            "yes".green().to_string()
        } else {
            "no".red().to_string()
        },
    );
    if let Some(cluster_home) = &spec.cluster_home {
        ui::kv("cluster home", cluster_home);
    }
    if let Some(username) = &spec.username {
        ui::kv("user", username);
    }
    if spec.password.is_some() {
        ui::kv("password", "(sensitive)");
    }
    if let Some(namespace) = &record.observed.namespace_name {
        ui::kv("namespace", namespace);
    }
    if !spec.tags.is_empty() {
        ui::kv("tags", &tag_list(spec));
    }

    ui::section("Hosts");
    for host in &record.observed.hosts {
        let os = [host.os_name.as_deref(), host.os_version.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        println!("  {} {} {}", host.hostname, host.id.dimmed(), os.dimmed());
        if detailed {
            if let Some(memory) = host.memory_size {
                ui::kv("memory", &format!("{} MiB", memory / (1024 * 1024)));
            }
            if let Some(available) = host.available {
                ui::kv("available", if available { "yes" } else { "no" });
            }
        }
    }

    if !record.observed.repositories.is_empty() {
        ui::section("Repositories");
        for repo in &record.observed.repositories {
            let version = repo.version.as_deref().unwrap_or("");
            println!("  {} {}", repo.name, version.dimmed());
        }
    }

    println!();
    ui::dim(&format!("last updated {}", record.last_updated.to_rfc3339()));
}

fn tag_list(spec: &EnvironmentSpec) -> String {
    spec.tags
        .iter()
        .map(|t| format!("{}={}", t.key, t.value))
        .collect::<Vec<_>>()
        .join(", ")
}

fn report_error(err: &ResourceError) {
    match err {
        ResourceError::Update(update) => {
            for failure in update.failures() {
                ui::error(&failure.to_string());
            }
        }
        other => ui::error(&other.to_string()),
    }
    if let Some(advice) = err.advice() {
        ui::dim(advice);
    }
}
