/// Example connecting to a Wi-Fi network by name.
///
/// Usage: `cargo run --example wifi_connect -- <name>` with the passphrase in
/// `WIFI_PASSWORD`.
use connmanrs::ConnMan;

#[tokio::main]
async fn main() -> connmanrs::Result<()> {
    let name = std::env::args().nth(1).unwrap_or_else(|| "MyNetwork".into());
    let passphrase = std::env::var("WIFI_PASSWORD").unwrap_or_default();

    let cm = ConnMan::new().await?;

    let wifi = cm.wifi().await?;
    if !wifi.powered {
        println!("Powering on {}...", wifi.name);
        cm.enable_technology(&wifi).await?;
    }

    println!("Scanning...");
    cm.scan(&wifi).await?;

    let services = cm.list_services().await?;
    let Some(svc) = services.iter().find(|s| s.name == name) else {
        println!("No service named '{name}'");
        return Ok(());
    };

    println!("Connecting to '{}' (security: {:?})", svc.name, svc.security);
    cm.connect(svc, &passphrase).await?;
    println!("Connected successfully!");

    Ok(())
}
