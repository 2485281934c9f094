use crate::test::template;
use log::{error, info};
use std::error::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;

pub async fn create_definition_template(
    output: bool,
    name: Option<String>,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let result = serde_yaml::to_string(&template::template())?;

    if output {
        println!("{}", result);
        return Ok(());
    }

    let Some(n) = name else {
        error!("<NAME> is required if not outputting to screen. `asc new <NAME>`");
        return Err("missing cli parameter".into());
    };

    let filename = if n.ends_with(".yaml") || n.ends_with(".yml") {
        n
    } else {
        format!("{}.yaml", n)
    };

    if std::path::Path::new(&filename).exists() {
        error!("`{}` already exists. Please pick a new name/location or delete the existing file.", filename);
        return Err(Box::new(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            "the output file already exists",
        )));
    }

    let mut file = fs::File::create(&filename).await?;
    file.write_all(result.as_bytes()).await?;
    info!("Successfully created test definition (`{}`).", filename);
    Ok(())
}
