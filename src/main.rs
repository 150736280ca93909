fn main() {
    if let Err(e) = med_reminder_lib::run() {
        eprintln!("med-reminder: {}", e);
        std::process::exit(1);
    }
}
