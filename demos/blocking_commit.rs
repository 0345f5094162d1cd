#[cfg(feature = "blocking")]
use mpctl::{BlockingController, ControllerOptions, Job};

#[cfg(not(feature = "blocking"))]
fn main() {
    eprintln!("This example requires `--features blocking`.");
}

// Runs `/bin/echo --cmd <command>` for each argument, so the echoed flags come back as text.
#[cfg(feature = "blocking")]
fn main() {
    let mut opts = ControllerOptions::default().with_worker("/bin/echo", Vec::<String>::new());
    opts.encoding = mpctl::ArgEncoding::Plain;
    opts.concurrency_limit = 2;

    let mut ctl = match BlockingController::new(opts) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{e:?}");
            std::process::exit(1);
        }
    };

    let commands: Vec<String> = std::env::args().skip(1).collect();
    let commands = if commands.is_empty() {
        vec!["one".to_string(), "two".to_string(), "three".to_string()]
    } else {
        commands
    };
    for command in commands {
        if let Err(e) = ctl.add(Job::new(command)) {
            eprintln!("{e:?}");
            std::process::exit(1);
        }
    }

    let results = match ctl.commit() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("{e:?}");
            std::process::exit(1);
        }
    };

    for (index, entry) in results {
        println!("{index}: {:?}", entry.data);
    }
}
