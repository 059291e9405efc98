//! Construction de points à partir de paires de coordonnées

use crate::dataset::Value;
use crate::types::{Coord, Shape};

/// Construit un point depuis deux valeurs numériques ou coercibles
///
/// Renvoie `None` si l'une des valeurs est absente, non numérique ou non finie.
pub fn point_from_values(x: &Value, y: &Value) -> Option<Shape> {
    Some(Shape::Point(Coord::xy(x.as_f64()?, y.as_f64()?)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_and_text() {
        let p = point_from_values(&Value::Float(121.5), &Value::from("25.03")).unwrap();
        assert_eq!(p, Shape::Point(Coord::xy(121.5, 25.03)));
    }

    #[test]
    fn test_missing_or_garbage() {
        assert!(point_from_values(&Value::Null, &Value::Float(25.0)).is_none());
        assert!(point_from_values(&Value::from("n/a"), &Value::Float(25.0)).is_none());
        assert!(point_from_values(&Value::from(""), &Value::from("")).is_none());
        assert!(point_from_values(&Value::Boolean(true), &Value::Float(25.0)).is_none());
    }
}
