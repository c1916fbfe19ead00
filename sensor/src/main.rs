mod host;

fn main() -> anyhow::Result<()> {
    host::run()
}
