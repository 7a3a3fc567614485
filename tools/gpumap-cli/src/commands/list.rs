//! List adapters and their outputs.

use gpumap_platform_core::AdapterInfo;

use super::Context;

pub fn run(ctx: &Context, json: bool) -> anyhow::Result<()> {
    let registry = ctx.initialized_registry()?;
    let snapshot = registry.snapshot();

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    println!("Adapters: {}", snapshot.adapters.len());
    for adapter in &snapshot.adapters {
        println!("  [{}] {}", adapter.index, describe(&adapter.info));
        if let Some(ref telemetry) = adapter.info.telemetry {
            println!("       Telemetry: {}", telemetry.model);
        }
        for &index in &adapter.outputs {
            let output = &snapshot.outputs[index].info;
            println!(
                "       Output {}: {} {}",
                index,
                output.device_name,
                if output.primary { "(primary)" } else { "" }
            );
        }
    }

    Ok(())
}

pub(crate) fn describe(info: &AdapterInfo) -> String {
    let mut line = format!(
        "{} ({:?} {:04x}:{:04x})",
        info.name, info.vendor, info.vendor_id, info.device_id
    );
    if let Some(id) = info.hardware_id {
        line.push_str(&format!(" id={id}"));
    }
    if let Some(ref driver) = info.driver {
        line.push_str(&format!(" driver={driver}"));
    }
    line
}
