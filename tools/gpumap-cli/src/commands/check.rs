//! Check probe availability and registry initialization.

use gpumap_platform_linux::capabilities::{
    all_required_available, check_capabilities, print_capability_report, Capability,
};
use gpumap_registry::{AdapterRegistry, RegistryError};
use serde_json::json;

use super::Context;

pub fn run(ctx: &Context, json: bool) -> anyhow::Result<()> {
    // host capabilities mean nothing for a synthetic system
    let capabilities = ctx
        .synthetic
        .is_none()
        .then(|| check_capabilities(&ctx.config.discovery));

    let mut registry = ctx.registry()?;
    let outcome = registry.initialize();

    if json {
        let report = json_report(capabilities.as_deref(), &registry, &outcome);
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("gpumap System Check");
    println!("{}", "=".repeat(50));

    if let Some(ref capabilities) = capabilities {
        print_capability_report(capabilities);
        println!();
        if !all_required_available(capabilities) {
            println!("[WARN] Some required capabilities are missing. See above for fixes.");
        }
    }

    match outcome {
        Ok(()) => {
            if let Some(graphics) = registry.graphics_api() {
                println!("[OK] Graphics API: {}", graphics.name());
            }
            match registry.telemetry() {
                Some(telemetry) if telemetry.is_available() => {
                    println!("[OK] Telemetry: {}", telemetry.name())
                }
                _ => println!("[WARN] Telemetry: unavailable"),
            }
            println!(
                "[OK] Adapters: {}, outputs: {}",
                registry.adapter_count(),
                registry.output_count()
            );
        }
        Err(e) => println!("[WARN] Discovery failed: {e}"),
    }

    Ok(())
}

fn json_report(
    capabilities: Option<&[Capability]>,
    registry: &AdapterRegistry,
    outcome: &Result<(), RegistryError>,
) -> serde_json::Value {
    json!({
        "capabilities": capabilities,
        "initialized": outcome.is_ok(),
        "error": outcome.as_ref().err().map(ToString::to_string),
        "graphics_api": registry.graphics_api().map(|api| api.name().to_string()),
        "telemetry": registry
            .telemetry()
            .filter(|api| api.is_available())
            .map(|api| api.name().to_string()),
        "adapters": registry.adapter_count(),
        "outputs": registry.output_count(),
    })
}
