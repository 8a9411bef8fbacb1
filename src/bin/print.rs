use bibd_rust::{
    device::{Backend, init_device},
    model::BibdMlpConfig,
};

fn main() -> anyhow::Result<()> {
    let device = init_device();
    let model = BibdMlpConfig::new(28 * 28, 10, 5).init::<Backend>(&device)?;

    println!("{model}");
    Ok(())
}
