fn main() -> anyhow::Result<()> {
    lostfound::cli::run()
}
