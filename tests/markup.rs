use crop_markup::render::export_markup;
use crop_markup::scallop::{scallop_path, ScallopBorder};
use crop_markup::transform::{TransformGesture, TransformHandle, TransformNormalizer};
use crop_markup::{
    Color4, CroppedImage, EditorConfig, EditorState, ShapeKind, ShapePatch, ShapeTool,
};
use image::{Rgba, RgbaImage};

fn add(state: &mut EditorState, tool: ShapeTool) -> crop_markup::ShapeId {
    let id = state.next_shape_id(tool.id_prefix());
    state.add_shape(tool.create(id.clone(), Color4::BLACK, 4.0, &EditorConfig::default()));
    id
}

#[test]
fn add_then_remove_restores_list() {
    let mut state = EditorState::new();
    add(&mut state, ShapeTool::Arrow);
    add(&mut state, ShapeTool::Cloud);
    let before = state.shapes().to_vec();

    let id = add(&mut state, ShapeTool::Circle);
    assert_eq!(state.shapes().len(), 3);
    state.remove_shape(&id);
    assert_eq!(state.shapes(), &before[..]);
}

#[test]
fn update_touches_only_its_target() {
    let mut state = EditorState::new();
    let ids: Vec<_> = ShapeTool::ALL.iter().map(|&tool| add(&mut state, tool)).collect();
    let before = state.shapes().to_vec();

    state.update_shape(
        &ids[2],
        &ShapePatch {
            x: Some(1.0),
            width: Some(33.0),
            rotation: Some(12.0),
            ..Default::default()
        },
    );

    for (i, (now, was)) in state.shapes().iter().zip(&before).enumerate() {
        if i == 2 {
            assert_ne!(now, was);
            assert_eq!(now.x, 1.0);
            assert_eq!(now.rotation, 12.0);
        } else {
            assert_eq!(now, was);
        }
    }
}

#[test]
fn scallop_square_has_sixteen_arcs() {
    let path = scallop_path(100.0, 100.0, ScallopBorder::Filled { scallops_per_side: 4 });
    assert_eq!(path.arcs.len(), 16);
    assert!(path.arcs.iter().all(|arc| (arc.radius - 6.25).abs() < 1e-6));
}

#[test]
fn select_and_drag_rectangle() {
    let mut state = EditorState::new();
    let id = add(&mut state, ShapeTool::Rectangle);
    {
        let shape = state.shape(&id).unwrap();
        assert_eq!((shape.x, shape.y), (100.0, 100.0));
    }

    state.select_shape(Some(id.clone()));
    assert!(state.drag_selected_to(150.0, 120.0));

    assert_eq!(state.shapes().len(), 1);
    let shape = &state.shapes()[0];
    assert_eq!((shape.x, shape.y), (150.0, 120.0));
    assert_eq!(
        shape.kind,
        ShapeKind::Rectangle {
            width: 100.0,
            height: 100.0
        }
    );
}

#[test]
fn transform_gesture_commits_size_not_scale() {
    let mut state = EditorState::new();
    let id = add(&mut state, ShapeTool::Callout);
    state.select_shape(Some(id.clone()));

    let shape = state.selected_shape().unwrap().clone();
    let gesture = TransformGesture::begin(&shape, TransformHandle::BottomRight);
    let mut normalizer = TransformNormalizer::begin(&shape);
    let corner = shape.stage_corners()[2];
    state.update_shape(&id, &gesture.update((corner.0 + 68.0, corner.1)));

    let live = state.selected_shape().unwrap();
    assert!(live.scale_x > 1.0);
    let patch = normalizer.commit(live).unwrap();
    state.update_shape(&id, &patch);

    let done = state.selected_shape().unwrap();
    assert_eq!((done.scale_x, done.scale_y), (1.0, 1.0));
    match done.kind {
        ShapeKind::ScallopedRectangle { width, height, .. } => {
            assert!(width > 120.0);
            assert!((height - 80.0).abs() < 1e-3);
        }
        ref other => panic!("unexpected kind {other:?}"),
    }
}

#[test]
fn export_draws_over_the_crop() {
    let mut state = EditorState::new();
    assert!(export_markup(&state).unwrap().is_none());

    let base = RgbaImage::from_pixel(300, 300, Rgba([255, 255, 255, 255]));
    state.set_cropped_image(CroppedImage::from_rgba(&base).unwrap());
    add(&mut state, ShapeTool::Rectangle);

    let out = export_markup(&state).unwrap().unwrap();
    assert_eq!(out.dimensions(), (300, 300));
    assert_eq!(out.get_pixel(150, 100).0, [0, 0, 0, 255]);
    assert_eq!(out.get_pixel(150, 150).0, [255, 255, 255, 255]);
}
