use connmanrs::ConnMan;

#[tokio::main]
async fn main() -> connmanrs::Result<()> {
    let cm = ConnMan::new().await?;

    for tech in cm.list_technologies().await? {
        println!(
            "{:12} powered={} connected={}",
            tech.name, tech.powered, tech.connected
        );
    }

    println!();
    for svc in cm.list_services().await? {
        println!(
            "{:30} {:10} {:12} {:3}% {}",
            svc.name,
            svc.service_type,
            svc.state,
            svc.strength,
            svc.ipv4.address
        );
    }

    cm.close().await
}
