use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use declarative::FieldCapability;

use crate::resource::capabilities::EntityKind;
use crate::ui;

/// Print the capability of every field of `kind`.
pub fn run(kind: EntityKind) -> Result<()> {
    let table = kind.capabilities();
    let name = kind
        .to_possible_value()
        .map_or_else(|| format!("{kind:?}"), |v| v.get_name().to_string());

    ui::header(&format!("{name} fields"));
    for field in table.fields() {
        let Some(capability) = table.capability(field) else {
            continue;
        };
        let label = label(capability);
        let label = match capability {
            FieldCapability::Updatable => label.green(),
            FieldCapability::Destructive => label.yellow(),
            FieldCapability::CreateOnly => label.dimmed(),
        };
        println!("  {field:<32} {label}");
    }
    Ok(())
}

fn label(capability: FieldCapability) -> &'static str {
    match capability {
        FieldCapability::Updatable => "updatable",
        FieldCapability::Destructive => "destructive",
        FieldCapability::CreateOnly => "create-only",
    }
}
