//! Look up an output by name or an adapter by hardware id.

use gpumap_platform_core::HardwareId;
use gpumap_registry::NO_OUTPUT;

use super::list::describe;
use super::Context;

pub fn run(
    ctx: &Context,
    name: Option<String>,
    hardware_id: Option<HardwareId>,
) -> anyhow::Result<()> {
    let registry = ctx.initialized_registry()?;

    if let Some(name) = name {
        let id = registry.output_id(&name);
        if id == NO_OUTPUT {
            println!("Output '{name}': not found");
        } else {
            println!("Output '{name}': {id}");
        }
    }

    if let Some(hardware_id) = hardware_id {
        match registry
            .adapter_by_hardware_id(hardware_id)
            .and_then(|handle| registry.adapter(handle))
        {
            Some(adapter) => println!("Adapter {hardware_id}: {}", describe(&adapter.info())),
            None => println!("Adapter {hardware_id}: not found"),
        }
    }

    Ok(())
}
