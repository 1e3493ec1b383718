use rask_haproxy_ingest::app;

fn main() -> anyhow::Result<()> {
    app::main()
}
