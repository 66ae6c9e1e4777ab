use serde::Deserialize;
use strata::config::{ConfigBuilder, Options, OptionsShape};
use strata::AppContext;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LocalAuth {
    authority: String,
    client_id: String,
    #[serde(default)]
    validate_authority: bool,
}

impl Options for LocalAuth {
    const SECTION: &'static str = "Local";

    fn shape() -> OptionsShape {
        OptionsShape::new()
            .string("Authority")
            .string("ClientId")
            .boolean("ValidateAuthority")
    }
}

fn main() -> Result<(), strata::Error> {
    let ctx = AppContext::builder()
        .with_config(
            ConfigBuilder::new()
                .with_json_file("demos/appsettings.json", true)
                .with_json_file("demos/appsettings.Development.json", false)
                .with_memory([("wheels:brand", "Blazin")])
                .build()?,
        )
        .with_logging(true)
        .build()?;

    let wheels = ctx.section("wheels");
    for name in wheels.children() {
        tracing::info!(key = %name, value = ?wheels.get(&name), "wheels");
    }

    let auth = ctx.options::<LocalAuth>()?;
    println!(
        "Authority: {} (client {}, validate={})",
        auth.authority, auth.client_id, auth.validate_authority
    );

    Ok(())
}
