use serde::{Deserialize, Serialize};

pub mod parameters;

pub use parameters::{check_expression, evaluate_expression, numeric_value, ExpressionError};

/// Индекс опорной точки эскиза (никогда не удаляется)
pub const ANCHOR: usize = 0;

/// Значение вторичного индекса "нет второго объекта" в текстовом протоколе
pub const NO_SECONDARY: i64 = -1;

// ============================================================================
// Segments
// ============================================================================

/// Тип сегмента эскиза
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentKind {
    Line,
    CircularArc,
    SplinePoint,
    BezierPoint,
}

impl SegmentKind {
    /// Однобуквенный код для протокола
    pub fn code(&self) -> char {
        match self {
            SegmentKind::Line => 'L',
            SegmentKind::CircularArc => 'C',
            SegmentKind::SplinePoint => 'S',
            SegmentKind::BezierPoint => 'B',
        }
    }

    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'L' => Some(SegmentKind::Line),
            'C' => Some(SegmentKind::CircularArc),
            'S' => Some(SegmentKind::SplinePoint),
            'B' => Some(SegmentKind::BezierPoint),
            _ => None,
        }
    }

    /// Сегменты, которые образуют цепочки кривых (сплайн / Безье)
    pub fn is_curve_run(&self) -> bool {
        matches!(self, SegmentKind::SplinePoint | SegmentKind::BezierPoint)
    }
}

/// Производная геометрия дуги (пересчитывается из концов и прогиба)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArcGeometry {
    pub xc: f64,
    pub yc: f64,
    /// Знак радиуса совпадает со знаком прогиба и задаёт направление обхода
    pub radius: f64,
    pub angle_beg: f64,
    pub angle_end: f64,
}

impl ArcGeometry {
    /// Signed sweep from `angle_beg` to `angle_end`, positive when the radius is positive.
    pub fn sweep(&self) -> f64 {
        let tau = std::f64::consts::TAU;
        let mut delta = (self.angle_end - self.angle_beg) % tau;
        if delta < 0.0 {
            delta += tau;
        }
        if self.radius > 0.0 || delta == 0.0 {
            delta
        } else {
            delta - tau
        }
    }
}

/// Сегмент эскиза
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub kind: SegmentKind,
    pub begin: usize,
    pub end: usize,
    /// Средняя точка (для дуги: середина дуги), используется для выбора
    pub xm: f64,
    pub ym: f64,
    /// Коды ограничений, привязанных к сегменту
    pub label: String,
    /// Прогиб дуги в пикселях экрана (0 для остальных типов)
    #[serde(default)]
    pub dip: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arc: Option<ArcGeometry>,
}

impl Segment {
    pub fn new(kind: SegmentKind, begin: usize, end: usize) -> Self {
        Self {
            kind,
            begin,
            end,
            xm: 0.0,
            ym: 0.0,
            label: String::new(),
            dip: 0.0,
            arc: None,
        }
    }

    pub fn is_arc(&self) -> bool {
        self.kind == SegmentKind::CircularArc
    }
}

/// Точка эскиза в экранных координатах
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SketchPoint {
    pub x: f64,
    pub y: f64,
    /// Коды ограничений, привязанных к точке
    pub label: String,
}

impl SketchPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            label: String::new(),
        }
    }

    pub fn pos(&self) -> [f64; 2] {
        [self.x, self.y]
    }
}

/// Символьная переменная (степень свободы эскиза)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub value: String,
}

// ============================================================================
// Constraints
// ============================================================================

/// Класс объекта, к которому применяется ограничение
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetClass {
    Point,
    Segment,
    Offset,
    Internal,
}

/// Тип ограничения
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstraintKind {
    #[serde(rename = "X")]
    X,
    #[serde(rename = "Y")]
    Y,
    #[serde(rename = "P")]
    Perpendicular,
    #[serde(rename = "T")]
    Tangent,
    #[serde(rename = "A")]
    Angle,
    #[serde(rename = "H")]
    Horizontal,
    #[serde(rename = "V")]
    Vertical,
    #[serde(rename = "I")]
    Inclination,
    #[serde(rename = "L")]
    Length,
    #[serde(rename = "R")]
    Radius,
    #[serde(rename = "S")]
    Sweep,
    #[serde(rename = "W")]
    Width,
    #[serde(rename = "D")]
    Depth,
    #[serde(rename = "Z")]
    ZeroLength,
}

impl ConstraintKind {
    pub fn code(&self) -> char {
        match self {
            ConstraintKind::X => 'X',
            ConstraintKind::Y => 'Y',
            ConstraintKind::Perpendicular => 'P',
            ConstraintKind::Tangent => 'T',
            ConstraintKind::Angle => 'A',
            ConstraintKind::Horizontal => 'H',
            ConstraintKind::Vertical => 'V',
            ConstraintKind::Inclination => 'I',
            ConstraintKind::Length => 'L',
            ConstraintKind::Radius => 'R',
            ConstraintKind::Sweep => 'S',
            ConstraintKind::Width => 'W',
            ConstraintKind::Depth => 'D',
            ConstraintKind::ZeroLength => 'Z',
        }
    }

    pub fn from_code(code: char) -> Option<Self> {
        Self::all().iter().copied().find(|k| k.code() == code)
    }

    pub fn all() -> &'static [ConstraintKind] {
        &[
            ConstraintKind::X,
            ConstraintKind::Y,
            ConstraintKind::Perpendicular,
            ConstraintKind::Tangent,
            ConstraintKind::Angle,
            ConstraintKind::Horizontal,
            ConstraintKind::Vertical,
            ConstraintKind::Inclination,
            ConstraintKind::Length,
            ConstraintKind::Radius,
            ConstraintKind::Sweep,
            ConstraintKind::Width,
            ConstraintKind::Depth,
            ConstraintKind::ZeroLength,
        ]
    }

    /// К какому объекту привязано ограничение
    pub fn target_class(&self) -> TargetClass {
        match self {
            ConstraintKind::X
            | ConstraintKind::Y
            | ConstraintKind::Perpendicular
            | ConstraintKind::Tangent
            | ConstraintKind::Angle => TargetClass::Point,
            ConstraintKind::Horizontal
            | ConstraintKind::Vertical
            | ConstraintKind::Inclination
            | ConstraintKind::Length
            | ConstraintKind::Radius
            | ConstraintKind::Sweep => TargetClass::Segment,
            ConstraintKind::Width | ConstraintKind::Depth => TargetClass::Offset,
            ConstraintKind::ZeroLength => TargetClass::Internal,
        }
    }

    /// Несёт ли ограничение значение, введённое пользователем
    pub fn has_value(&self) -> bool {
        !matches!(
            self,
            ConstraintKind::Perpendicular
                | ConstraintKind::Tangent
                | ConstraintKind::Horizontal
                | ConstraintKind::Vertical
                | ConstraintKind::ZeroLength
        )
    }

    /// Виды ограничений, несовместимые с данным на одном объекте
    pub fn conflicts_with(&self) -> &'static [ConstraintKind] {
        match self {
            ConstraintKind::Horizontal => &[ConstraintKind::Vertical, ConstraintKind::Inclination],
            ConstraintKind::Vertical => &[ConstraintKind::Horizontal, ConstraintKind::Inclination],
            ConstraintKind::Inclination => &[ConstraintKind::Horizontal, ConstraintKind::Vertical],
            ConstraintKind::Perpendicular => &[ConstraintKind::Tangent, ConstraintKind::Angle],
            ConstraintKind::Tangent => &[ConstraintKind::Perpendicular, ConstraintKind::Angle],
            ConstraintKind::Angle => &[ConstraintKind::Perpendicular, ConstraintKind::Tangent],
            _ => &[],
        }
    }

    /// Human-readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            ConstraintKind::X => "X coordinate",
            ConstraintKind::Y => "Y coordinate",
            ConstraintKind::Perpendicular => "perpendicular",
            ConstraintKind::Tangent => "tangent",
            ConstraintKind::Angle => "angle",
            ConstraintKind::Horizontal => "horizontal",
            ConstraintKind::Vertical => "vertical",
            ConstraintKind::Inclination => "inclination",
            ConstraintKind::Length => "length",
            ConstraintKind::Radius => "radius",
            ConstraintKind::Sweep => "sweep",
            ConstraintKind::Width => "width",
            ConstraintKind::Depth => "depth",
            ConstraintKind::ZeroLength => "zero length",
        }
    }
}

impl std::fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Маркер пары Z-ограничений вырожденного сегмента
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZMarker {
    First,
    Second,
}

/// Объект(ы), к которым привязано ограничение
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConstraintTarget {
    Point { index: usize },
    Segment { index: usize },
    Offset { base: usize, target: usize },
    ZeroLength { point: usize, marker: ZMarker },
}

impl ConstraintTarget {
    /// Основной индекс (точка или сегмент), с нуля
    pub fn primary(&self) -> usize {
        match *self {
            ConstraintTarget::Point { index } | ConstraintTarget::Segment { index } => index,
            ConstraintTarget::Offset { base, .. } => base,
            ConstraintTarget::ZeroLength { point, .. } => point,
        }
    }

    /// Пара индексов в текстовом протоколе (основной с единицы, вторичный с единицы или метка)
    pub fn to_wire(&self) -> (i64, i64) {
        let primary = self.primary() as i64 + 1;
        let secondary = match *self {
            ConstraintTarget::Point { .. } | ConstraintTarget::Segment { .. } => NO_SECONDARY,
            ConstraintTarget::Offset { target, .. } => target as i64 + 1,
            ConstraintTarget::ZeroLength { marker: ZMarker::First, .. } => -2,
            ConstraintTarget::ZeroLength { marker: ZMarker::Second, .. } => -3,
        };
        (primary, secondary)
    }

    /// Decode wire indices for the given kind. Returns `None` when the pair does not fit the kind.
    pub fn from_wire(kind: ConstraintKind, primary: i64, secondary: i64) -> Option<Self> {
        if primary < 1 {
            return None;
        }
        let index = (primary - 1) as usize;
        match kind.target_class() {
            TargetClass::Point if secondary == NO_SECONDARY => {
                Some(ConstraintTarget::Point { index })
            }
            TargetClass::Segment if secondary == NO_SECONDARY => {
                Some(ConstraintTarget::Segment { index })
            }
            TargetClass::Offset if secondary >= 1 => Some(ConstraintTarget::Offset {
                base: index,
                target: (secondary - 1) as usize,
            }),
            TargetClass::Internal => {
                let marker = match secondary {
                    -2 => ZMarker::First,
                    -3 => ZMarker::Second,
                    _ => return None,
                };
                Some(ConstraintTarget::ZeroLength {
                    point: index,
                    marker,
                })
            }
            _ => None,
        }
    }

    /// Точки, к которым привязано ограничение (для меток и выбора)
    pub fn point(&self) -> Option<usize> {
        match *self {
            ConstraintTarget::Point { index } => Some(index),
            ConstraintTarget::ZeroLength { point, .. } => Some(point),
            _ => None,
        }
    }

    pub fn segment(&self) -> Option<usize> {
        match *self {
            ConstraintTarget::Segment { index } => Some(index),
            _ => None,
        }
    }
}

/// Ограничение эскиза
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    pub kind: ConstraintKind,
    pub target: ConstraintTarget,
    /// Числовое или символьное значение; "0" для ограничений без значения
    pub value: String,
}

impl Constraint {
    pub fn new(kind: ConstraintKind, target: ConstraintTarget, value: impl Into<String>) -> Self {
        Self {
            kind,
            target,
            value: value.into(),
        }
    }

    /// Numeric value if the expression has no free identifiers
    pub fn numeric(&self) -> Option<f64> {
        numeric_value(&self.value)
    }
}

// ============================================================================
// Calibration
// ============================================================================

/// Недостающая часть калибровки
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationField {
    Scale,
    XOrigin,
    YOrigin,
}

impl std::fmt::Display for CalibrationField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CalibrationField::Scale => write!(f, "scale"),
            CalibrationField::XOrigin => write!(f, "X-origin"),
            CalibrationField::YOrigin => write!(f, "Y-origin"),
        }
    }
}

/// Связь экранных пикселей с физическими единицами
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    /// Физических единиц на пиксель
    pub scale: Option<f64>,
    /// Экранная X-координата физического нуля
    pub xorig: Option<f64>,
    /// Экранная Y-координата физического нуля
    pub yorig: Option<f64>,
}

impl Calibration {
    pub fn is_complete(&self) -> bool {
        self.missing().is_empty()
    }

    pub fn missing(&self) -> Vec<CalibrationField> {
        let mut missing = Vec::new();
        if self.scale.is_none() {
            missing.push(CalibrationField::Scale);
        }
        if self.xorig.is_none() {
            missing.push(CalibrationField::XOrigin);
        }
        if self.yorig.is_none() {
            missing.push(CalibrationField::YOrigin);
        }
        missing
    }

    /// Экран -> физические координаты
    pub fn to_physical(&self, x: f64, y: f64) -> Option<[f64; 2]> {
        let (scale, xorig, yorig) = (self.scale?, self.xorig?, self.yorig?);
        Some([(x - xorig) * scale, (yorig - y) * scale])
    }

    /// Физические -> экранные координаты
    pub fn to_screen(&self, x: f64, y: f64) -> Option<[f64; 2]> {
        let (scale, xorig, yorig) = (self.scale?, self.xorig?, self.yorig?);
        Some([xorig + x / scale, yorig - y / scale])
    }
}

/// Начальная точка эскиза, переданная хост-документом
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeginPoint {
    pub x: String,
    pub y: String,
    pub z: String,
    /// Координаты эскиза отсчитываются от начальной точки
    pub relative: bool,
}

impl Default for BeginPoint {
    fn default() -> Self {
        Self {
            x: "0".to_string(),
            y: "0".to_string(),
            z: "0".to_string(),
            relative: false,
        }
    }
}

impl BeginPoint {
    /// Значения X/Y ограничений опорной точки по умолчанию
    pub fn anchor_values(&self) -> (String, String) {
        if self.relative {
            ("0".to_string(), "0".to_string())
        } else {
            (self.x.clone(), self.y.clone())
        }
    }
}
