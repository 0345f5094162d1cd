use mpctl::{Controller, Job};

// Usage: MPCTL_WORKER=/usr/bin/php MPCTL_WORKER_ARGS=/srv/app/api.php \
//        cargo run --example run_batch -- report/daily report/weekly
fn main() {
    if let Err(e) = smol::block_on(run()) {
        eprintln!("{e:?}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), mpctl::Error> {
    let mut ctl = Controller::from_env()?;
    for command in std::env::args().skip(1) {
        ctl.add(Job::new(command))?;
    }
    if ctl.is_empty() {
        ctl.add(Job::new("ping"))?;
    }

    for (index, entry) in ctl.commit().await? {
        match &entry.failure {
            None => println!(
                "{index} {}: exit={:?} data={:?}",
                entry.command, entry.exit_code, entry.data
            ),
            Some(failure) => println!("{index} {}: failed: {failure:?}", entry.command),
        }
    }
    Ok(())
}
