//! Show the primary output.

use gpumap_registry::NO_OUTPUT;

use super::Context;

pub fn run(ctx: &Context) -> anyhow::Result<()> {
    let registry = ctx.initialized_registry()?;

    let id = registry.primary_output_id();
    if id == NO_OUTPUT {
        println!("No primary output");
        return Ok(());
    }

    let Some(handle) = registry.output_at(id as usize) else {
        anyhow::bail!("Primary output {id} disappeared from the registry");
    };
    if let Some(output) = registry.output(handle) {
        println!("Primary output {id}: {}", output.device_name());
    }
    if let Some(adapter) = registry
        .output_adapter(handle)
        .and_then(|adapter| registry.adapter(adapter))
    {
        println!("  Adapter: {}", adapter.name());
    }

    Ok(())
}
