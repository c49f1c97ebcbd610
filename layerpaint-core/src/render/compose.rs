//! Straight-alpha compositing of a snapshot's layers into one RGBA8 buffer.

use rayon::prelude::*;

use crate::{
    blend::Blend,
    raster::layout::to_rgba,
    state::{DocumentSnapshot, Layer},
};

/// Flatten every visible layer, bottom-most first, onto a transparent canvas.
/// The result is packed straight (non-premultiplied) RGBA8, row-major.
#[must_use]
pub fn flatten(snapshot: &DocumentSnapshot) -> Vec<u8> {
    let [width, height] = snapshot.size();
    let row_len = width as usize * 4;
    let mut pixels = vec![0u8; row_len * height as usize];
    if row_len == 0 {
        return pixels;
    }
    let layers: Vec<&Layer> = snapshot
        .layers()
        .iter()
        .filter(|layer| layer.is_visible() && layer.blend().opacity.get() > 0.0)
        .collect();

    pixels
        .par_chunks_exact_mut(row_len)
        .enumerate()
        .for_each(|(y, row)| {
            let row: &mut [[u8; 4]] = bytemuck::cast_slice_mut(row);
            for layer in &layers {
                let raster = layer.raster();
                let layout = raster.layout();
                let src_len = width as usize * layout.channels();
                let Some(src) = raster.data().get(y * src_len..(y + 1) * src_len) else {
                    // Layers always match the canvas, but don't trust it with a panic.
                    continue;
                };
                for (dst, src) in row.iter_mut().zip(src.chunks_exact(layout.channels())) {
                    *dst = over(to_rgba(src, layout), *dst, layer.blend());
                }
            }
        });
    pixels
}

/// Composite one straight-alpha pixel over another.
fn over(src: [u8; 4], dst: [u8; 4], blend: Blend) -> [u8; 4] {
    let unit = |v: u8| f32::from(v) / 255.0;
    let src_alpha = unit(src[3]) * blend.opacity.get();
    let dst_alpha = unit(dst[3]);
    let out_alpha = src_alpha + dst_alpha * (1.0 - src_alpha);
    if out_alpha <= 0.0 {
        return [0; 4];
    }
    let mut out = [0u8; 4];
    for channel in 0..3 {
        let s = unit(src[channel]);
        let d = unit(dst[channel]);
        // Blend modes only apply where there's something beneath.
        let mixed = (1.0 - dst_alpha) * s + dst_alpha * blend.mode.apply(s, d);
        let value = (src_alpha * mixed + dst_alpha * (1.0 - src_alpha) * d) / out_alpha;
        out[channel] = quantize(value);
    }
    out[3] = quantize(out_alpha);
    out
}

fn quantize(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod test {
    use super::{flatten, over};
    use crate::{
        blend::{Blend, BlendMode},
        raster::{ChannelLayout, Raster},
        state::{layer::LayerStack, Document, Layer},
        util::UnitF32,
    };

    #[test]
    fn opaque_covers() {
        let blend = Blend::default();
        assert_eq!(over([10, 20, 30, 255], [200, 200, 200, 255], blend), [10, 20, 30, 255]);
        assert_eq!(over([10, 20, 30, 0], [200, 200, 200, 255], blend), [200, 200, 200, 255]);
        assert_eq!(over([0; 4], [0; 4], blend), [0; 4]);
    }
    #[test]
    fn opacity_mixes() {
        let half = Blend::default().with_opacity(UnitF32::new(0.5).unwrap());
        assert_eq!(over([255, 255, 255, 255], [0, 0, 0, 255], half), [128, 128, 128, 255]);
        // Onto nothing, the color stays and only alpha drops.
        assert_eq!(over([255, 0, 0, 255], [0; 4], half), [255, 0, 0, 128]);
    }
    #[test]
    fn modes() {
        let multiply = Blend::default().with_mode(BlendMode::Multiply);
        assert_eq!(over([128, 255, 0, 255], [255, 128, 128, 255], multiply), [128, 128, 0, 255]);
        let add = Blend::default().with_mode(BlendMode::Add);
        assert_eq!(over([200, 10, 0, 255], [100, 10, 0, 255], add), [255, 20, 0, 255]);
    }
    #[test]
    fn flattens_visible_layers() {
        let mut document = Document::blank(2, 1).unwrap();
        let gray = Raster::from_raw(2, 1, ChannelLayout::Gray, vec![0, 100]).unwrap();
        let layers: &mut LayerStack = document.layers_mut();
        let top = Layer::new("Gray", gray);
        crate::commands::CommandConsumer::apply(
            layers,
            crate::commands::DoUndo::Do(&crate::commands::LayerCommand::Created { index: 1, layer: top }),
        )
        .unwrap();
        assert_eq!(flatten(&document.snapshot()), [0, 0, 0, 255, 100, 100, 100, 255]);
    }
    #[test]
    fn empty_canvas() {
        let document = Document::new(0, 3);
        assert!(flatten(&document.snapshot()).is_empty());
        let document = Document::new(2, 2);
        assert_eq!(flatten(&document.snapshot()), [0; 16]);
    }
}
