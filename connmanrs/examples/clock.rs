/// Example reading the clock and switching its update mode.
///
/// With no arguments the current time and mode are printed. `auto` switches
/// to automatic updates; `HH MM YYYY MM DD` sets the time manually.
use connmanrs::{Clock, ConnMan};

#[tokio::main]
async fn main() -> connmanrs::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let cm = ConnMan::new().await?;

    match args.as_slice() {
        [] => {
            let clock = cm.time().await;
            println!(
                "{:04}-{:02}-{:02} {:02}:{:02} ({})",
                clock.year, clock.month, clock.day, clock.hours, clock.minutes, clock.method
            );
            let props = cm.clock_properties().await?;
            println!("timezone: {}", props.timezone);
            println!("timeservers: {}", props.timeservers.join(", "));
        }
        [mode] if mode == "auto" => {
            cm.set_auto_time().await?;
            println!("Clock switched to automatic updates");
        }
        [hours, mins, year, month, day] => {
            let clock = Clock::parse(hours, mins, year, month, day)?;
            cm.set_manual_time(&clock).await?;
            println!("Clock set manually");
        }
        _ => eprintln!("usage: clock [auto | HH MM YYYY MM DD]"),
    }

    Ok(())
}
