use crate::cmd::{registry, CatalogArgs};
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_catalog, OutputFormat};

pub fn run(args: CatalogArgs, format: OutputFormat) -> CliResult<i32> {
    let registry = registry()?;
    let mut layouts = registry.layouts();
    if let Some(subsystem) = args.subsystem {
        layouts.retain(|layout| layout.identity.subsystem == subsystem);
    }
    layouts.sort_by_key(|layout| {
        (
            layout.identity.subsystem.bits(),
            layout.identity.id,
            layout.identity.kind.bits(),
        )
    });

    print_catalog(&layouts, format);
    Ok(SUCCESS)
}
